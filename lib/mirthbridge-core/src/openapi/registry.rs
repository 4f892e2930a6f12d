use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::naming::{UNTAGGED_DOMAIN, fallback_action_id, normalize_domain};
use super::operation::{OperationMeta, OperationSummary};
use super::resolver::SpecResolver;

/// HTTP methods recognized as operations inside a path item.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "post", "put", "patch", "delete", "head", "options", "trace",
];

/// Errors raised while loading an OpenAPI document from disk.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum RegistryError {
    /// The document could not be read.
    #[display("Failed to read OpenAPI document '{path}': {source}")]
    #[from(skip)]
    Read {
        /// Location of the document.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[display("Failed to parse OpenAPI document '{path}': {source}")]
    #[from(skip)]
    Parse {
        /// Location of the document.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// A domain entry as returned by [`OpenApiRegistry::list_domains`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainInfo {
    /// Normalized domain token.
    pub domain: String,
    /// Human readable label, the first tag text seen for this domain.
    pub label: String,
}

/// In-memory index of the operations of an OpenAPI document.
///
/// Operations are grouped by domain then keyed by action. The registry is
/// built once and only read afterwards, so it can be shared across tasks
/// behind an `Arc` without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenApiRegistry {
    domains: BTreeMap<String, BTreeMap<String, OperationMeta>>,
    domain_labels: BTreeMap<String, String>,
}

impl OpenApiRegistry {
    /// Reads and indexes the OpenAPI JSON document at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let document: Value =
            serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let registry = Self::from_document(&document);
        info!(
            path = %path.display(),
            domains = registry.domains.len(),
            operations = registry.operation_count(),
            "OpenAPI registry loaded"
        );
        Ok(registry)
    }

    /// Indexes an already parsed OpenAPI document.
    ///
    /// Malformed path items or operations are skipped, methods outside
    /// [`HTTP_METHODS`] are ignored.
    pub fn from_document(document: &Value) -> Self {
        let resolver = SpecResolver::new(document);
        let mut registry = Self::default();

        let Some(paths) = document.get("paths").and_then(Value::as_object) else {
            debug!("no paths in OpenAPI document");
            return registry;
        };

        for (path, path_item) in paths {
            let Some(path_item) = path_item.as_object() else {
                debug!(%path, "skipping malformed path item");
                continue;
            };

            for (method, operation) in path_item {
                let method = method.to_lowercase();
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let Some(operation) = operation.as_object() else {
                    debug!(%path, %method, "skipping malformed operation");
                    continue;
                };

                let meta = extract_operation(&resolver, path, &method, path_item, operation);
                registry.register(meta);
            }
        }

        registry
    }

    /// Inserts an operation, replacing any previous one with the same action.
    ///
    /// The first tag seen for a domain stays its label.
    pub fn register(&mut self, operation: OperationMeta) {
        self.domain_labels
            .entry(operation.domain.clone())
            .or_insert_with(|| operation.tag.clone());
        self.domains
            .entry(operation.domain.clone())
            .or_default()
            .insert(operation.action.clone(), operation);
    }

    /// Lists every domain with its label, sorted by domain.
    pub fn list_domains(&self) -> Vec<DomainInfo> {
        self.domains
            .keys()
            .map(|domain| DomainInfo {
                domain: domain.clone(),
                label: self
                    .domain_labels
                    .get(domain)
                    .cloned()
                    .unwrap_or_else(|| domain.clone()),
            })
            .collect()
    }

    /// Lists the operations of a domain, sorted by action.
    ///
    /// Returns an empty list for an unknown domain.
    pub fn list_actions(&self, domain: &str) -> Vec<OperationSummary> {
        self.domains
            .get(domain)
            .map(|actions| actions.values().map(OperationMeta::summary).collect())
            .unwrap_or_default()
    }

    /// Looks up one operation.
    pub fn get_operation(&self, domain: &str, action: &str) -> Option<&OperationMeta> {
        self.domains.get(domain)?.get(action)
    }

    /// Iterates over the domain names, sorted.
    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Whether the domain exists.
    pub fn contains_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    /// Total number of indexed operations.
    pub fn operation_count(&self) -> usize {
        self.domains.values().map(BTreeMap::len).sum()
    }
}

fn extract_operation(
    resolver: &SpecResolver<'_>,
    path: &str,
    method: &str,
    path_item: &Map<String, Value>,
    operation: &Map<String, Value>,
) -> OperationMeta {
    let tag = operation
        .get("tags")
        .and_then(Value::as_array)
        .and_then(|tags| tags.first())
        .map_or_else(|| UNTAGGED_DOMAIN.to_string(), value_to_text);
    let domain = normalize_domain(&tag);

    let action = operation
        .get("operationId")
        .map(value_to_text)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| fallback_action_id(method, path));

    let (required_path_params, required_query_params) =
        collect_required_parameters(resolver, path_item, operation);

    let body = operation
        .get("requestBody")
        .map(|body| resolver.resolve_ref(body))
        .and_then(Value::as_object);
    let body_required = body
        .and_then(|body| body.get("required"))
        .is_some_and(is_truthy);
    let content = body
        .and_then(|body| body.get("content"))
        .and_then(Value::as_object);
    let mut request_media_types = content
        .map(|content| content.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    request_media_types.sort();
    let (body_schema_types, body_required_fields) = content
        .map(|content| extract_body_hints(resolver, content))
        .unwrap_or_default();

    OperationMeta {
        domain,
        tag,
        operation_id: action.clone(),
        action,
        method: method.to_uppercase(),
        path: path.to_string(),
        summary: text_field(operation, "summary"),
        description: text_field(operation, "description"),
        required_path_params,
        required_query_params,
        body_required,
        request_media_types,
        body_schema_types,
        body_required_fields,
    }
}

fn collect_required_parameters(
    resolver: &SpecResolver<'_>,
    path_item: &Map<String, Value>,
    operation: &Map<String, Value>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut required_path = BTreeSet::new();
    let mut required_query = BTreeSet::new();

    let declared = [path_item.get("parameters"), operation.get("parameters")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten();

    for parameter in declared {
        let parameter = resolver.resolve_ref(parameter);
        if !parameter.get("required").is_some_and(is_truthy) {
            continue;
        }
        let name = parameter
            .get("name")
            .map(value_to_text)
            .unwrap_or_default()
            .trim()
            .to_string();
        if name.is_empty() {
            continue;
        }
        match parameter.get("in").map(value_to_text).as_deref().map(str::trim) {
            Some("path") => {
                required_path.insert(name);
            }
            Some("query") => {
                required_query.insert(name);
            }
            _ => {}
        }
    }

    (required_path, required_query)
}

fn extract_body_hints(
    resolver: &SpecResolver<'_>,
    content: &Map<String, Value>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut schema_types = BTreeSet::new();
    let mut required_fields = BTreeSet::new();

    for media in content.values() {
        let Some(schema) = media.get("schema") else {
            continue;
        };
        let schema = resolver.resolve_schema(schema);
        if !schema.is_object() {
            continue;
        }

        let schema_type = schema.get("type").and_then(Value::as_str);
        if let Some(schema_type) = schema_type {
            schema_types.insert(schema_type.to_string());
        }

        for alternatives in ["oneOf", "anyOf"] {
            let options = schema
                .get(alternatives)
                .and_then(Value::as_array)
                .into_iter()
                .flatten();
            for option in options {
                let option = resolver.resolve_schema(option);
                if let Some(option_type) = option.get("type").and_then(Value::as_str) {
                    schema_types.insert(option_type.to_string());
                }
            }
        }

        if schema_type == Some("object")
            && let Some(required) = schema.get("required").and_then(Value::as_array)
        {
            required_fields.extend(required.iter().filter_map(Value::as_str).map(String::from));
        }
    }

    (schema_types, required_fields)
}

fn text_field(operation: &Map<String, Value>, key: &str) -> String {
    operation
        .get(key)
        .filter(|value| is_truthy(value))
        .map(value_to_text)
        .unwrap_or_default()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
