//! Tool surface handed to the protocol layer.
//!
//! [`ToolHost`] exposes two discovery tools, `list_domains` and
//! `list_actions`, plus one generic dispatch tool per domain. Tool arguments
//! arrive as JSON and results leave as JSON, so any protocol framing can sit
//! on top.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::dispatch::{Dispatcher, OperationExecutor, ProgressReporter};
use crate::envelope::{InvocationEnvelope, ResponseEnvelope};
use crate::openapi::{DomainInfo, OpenApiRegistry, OperationSummary};

/// Name of the domain discovery tool.
pub const LIST_DOMAINS_TOOL: &str = "list_domains";
/// Name of the action discovery tool.
pub const LIST_ACTIONS_TOOL: &str = "list_actions";

const UNKNOWN_DOMAIN: &str = "Unknown domain. Call list_domains() for valid domains.";

/// Errors raised before a tool call reaches the dispatcher.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum ToolError {
    /// No tool has this name.
    #[display("Unknown tool '{name}'. Call list_domains() for valid domains.")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// The arguments do not match the tool input.
    #[display("Invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Decoding error, with the path of the offending field.
        source: serde_path_to_error::Error<serde_json::Error>,
    },

    /// The tool result could not be turned into JSON.
    #[display("Cannot serialize the result of tool '{tool}': {source}")]
    Output {
        /// Tool name.
        tool: String,
        /// Serialization error.
        source: serde_json::Error,
    },
}

/// Name, description and input schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// One line description.
    pub description: String,
    /// JSON schema of the arguments.
    pub input_schema: Value,
}

/// Result of the `list_actions` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionListing {
    /// Requested domain.
    pub domain: String,
    /// Operations of the domain, sorted by action.
    pub actions: Vec<OperationSummary>,
    /// Set when the domain is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Arguments of a domain tool.
///
/// Every field but `action` may be omitted or `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolArguments {
    /// Action identifier within the domain.
    pub action: String,
    /// Path parameters.
    #[serde(default)]
    pub path_params: Option<IndexMap<String, Value>>,
    /// Query parameters.
    #[serde(default)]
    pub query: Option<IndexMap<String, Value>>,
    /// Request body.
    #[serde(default)]
    pub body: Option<Value>,
    /// Extra request headers.
    #[serde(default)]
    pub headers_override: Option<IndexMap<String, String>>,
}

impl From<ToolArguments> for InvocationEnvelope {
    fn from(arguments: ToolArguments) -> Self {
        let ToolArguments {
            action,
            path_params,
            query,
            body,
            headers_override,
        } = arguments;
        Self {
            action,
            path_params: path_params.unwrap_or_default(),
            query: query.unwrap_or_default(),
            body,
            headers_override: headers_override.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListActionsArguments {
    domain: String,
}

/// Tool table built once from the registry.
#[derive(Debug)]
pub struct ToolHost<E> {
    dispatcher: Dispatcher<E>,
    domain_tools: BTreeMap<String, ToolDescriptor>,
}

impl<E> ToolHost<E>
where
    E: OperationExecutor,
{
    /// Builds one domain tool per registry domain.
    pub fn new(dispatcher: Dispatcher<E>) -> Self {
        let domain_tools = dispatcher
            .registry()
            .domain_names()
            .map(|domain| (domain.to_string(), domain_tool_descriptor(domain)))
            .collect::<BTreeMap<_, _>>();
        debug!(count = domain_tools.len(), "domain tools registered");
        Self {
            dispatcher,
            domain_tools,
        }
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<E> {
        &self.dispatcher
    }

    fn registry(&self) -> &OpenApiRegistry {
        self.dispatcher.registry()
    }

    /// Every domain with its label.
    pub fn list_domains(&self) -> Vec<DomainInfo> {
        self.registry().list_domains()
    }

    /// Operations of `domain`, or an empty listing with a hint when the
    /// domain is unknown.
    pub fn list_actions(&self, domain: &str) -> ActionListing {
        let registry = self.registry();
        let error = (!registry.contains_domain(domain))
            .then(|| UNKNOWN_DOMAIN.to_string());
        ActionListing {
            domain: domain.to_string(),
            actions: registry.list_actions(domain),
            error,
        }
    }

    /// Descriptors of every tool: discovery tools first, then domain tools
    /// sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors = vec![
            ToolDescriptor {
                name: LIST_DOMAINS_TOOL.to_string(),
                description: "List all available API domains/tags.".to_string(),
                input_schema: json!({ "type": "object", "properties": {} }),
            },
            ToolDescriptor {
                name: LIST_ACTIONS_TOOL.to_string(),
                description: "List available actions for a domain.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "domain": { "type": "string" } },
                    "required": ["domain"],
                }),
            },
        ];
        descriptors.extend(self.domain_tools.values().cloned());
        descriptors
    }

    /// Whether `domain` has a dispatch tool.
    pub fn has_domain_tool(&self, domain: &str) -> bool {
        self.domain_tools.contains_key(domain)
    }

    /// Calls the dispatch tool of `domain`.
    ///
    /// # Errors
    ///
    /// Fails when no tool exists for `domain` or the arguments cannot be
    /// decoded. Dispatch failures are reported inside the envelope.
    pub async fn call_domain_tool(
        &self,
        domain: &str,
        arguments: Value,
    ) -> Result<ResponseEnvelope, ToolError> {
        let invocation = self.domain_invocation(domain, arguments)?;
        Ok(self.dispatcher.dispatch(domain, invocation).await)
    }

    /// Same as [`call_domain_tool`](Self::call_domain_tool), reporting
    /// progress to `progress`.
    ///
    /// # Errors
    ///
    /// See [`call_domain_tool`](Self::call_domain_tool).
    pub async fn call_domain_tool_with_progress<P>(
        &self,
        domain: &str,
        arguments: Value,
        progress: &P,
    ) -> Result<ResponseEnvelope, ToolError>
    where
        P: ProgressReporter,
    {
        let invocation = self.domain_invocation(domain, arguments)?;
        Ok(self
            .dispatcher
            .dispatch_with_progress(domain, invocation, progress)
            .await)
    }

    /// Calls any tool by name and returns its JSON result.
    ///
    /// # Errors
    ///
    /// Fails on an unknown tool name or undecodable arguments.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value, ToolError> {
        match tool {
            LIST_DOMAINS_TOOL => to_output(tool, &self.list_domains()),
            LIST_ACTIONS_TOOL => {
                let ListActionsArguments { domain } = decode_arguments(tool, arguments)?;
                to_output(tool, &self.list_actions(&domain))
            }
            domain => {
                let envelope = self.call_domain_tool(domain, arguments).await?;
                to_output(tool, &envelope)
            }
        }
    }

    fn domain_invocation(
        &self,
        domain: &str,
        arguments: Value,
    ) -> Result<InvocationEnvelope, ToolError> {
        if !self.has_domain_tool(domain) {
            return Err(ToolError::UnknownTool {
                name: domain.to_string(),
            });
        }
        let arguments: ToolArguments = decode_arguments(domain, arguments)?;
        Ok(arguments.into())
    }
}

fn domain_tool_descriptor(domain: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: domain.to_string(),
        description: format!("Dispatch NextGen Connect operations for domain '{domain}'."),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": { "type": "string" },
                "path_params": { "type": ["object", "null"] },
                "query": { "type": ["object", "null"] },
                "body": {},
                "headers_override": {
                    "type": ["object", "null"],
                    "additionalProperties": { "type": "string" },
                },
            },
            "required": ["action"],
        }),
    }
}

fn decode_arguments<T>(tool: &str, arguments: Value) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    serde_path_to_error::deserialize(arguments).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn to_output<T>(tool: &str, output: &T) -> Result<Value, ToolError>
where
    T: Serialize,
{
    serde_json::to_value(output).map_err(|source| ToolError::Output {
        tool: tool.to_string(),
        source,
    })
}
