//! Request and response envelopes.
//!
//! Every dispatch takes one [`InvocationEnvelope`] and returns exactly one
//! [`ResponseEnvelope`], whatever happened in between.

use http::header::CONTENT_TYPE;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::openapi::OperationMeta;

/// Method and path echoed when the operation could not be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

/// Status used for failures that never produced an HTTP response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// One caller request against an operation of a domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationEnvelope {
    /// Action identifier within the domain.
    pub action: String,
    /// Values for the `{name}` placeholders of the path template.
    #[serde(default)]
    pub path_params: IndexMap<String, Value>,
    /// Query string parameters.
    #[serde(default)]
    pub query: IndexMap<String, Value>,
    /// Request body, sent as JSON.
    #[serde(default)]
    pub body: Option<Value>,
    /// Extra request headers.
    #[serde(default)]
    pub headers_override: IndexMap<String, String>,
}

impl InvocationEnvelope {
    /// Creates an envelope for `action` without parameters nor body.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a header override.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers_override.insert(name.into(), value.into());
        self
    }

    /// The `Content-Type` header override, if any.
    ///
    /// The header name is matched case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.headers_override
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
            .map(|(_, value)| value.as_str())
    }
}

/// Failure categories reported in the `type` field of an envelope error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The domain has no such action.
    #[display("unknown_action")]
    UnknownAction,
    /// Missing required parameter or body, or unresolved path placeholder.
    #[display("validation_error")]
    ValidationError,
    /// The provided `Content-Type` is not accepted by the operation.
    #[display("unsupported_media_type")]
    UnsupportedMediaType,
    /// The body does not match the declared schema hints.
    #[display("malformed_body")]
    MalformedBody,
    /// Login failed.
    #[display("auth_error")]
    AuthError,
    /// The request timed out on the client side.
    #[display("timeout")]
    Timeout,
    /// Any other network failure.
    #[display("transport_error")]
    TransportError,
    /// The remote API answered with a non-2xx status.
    #[display("upstream_error")]
    UpstreamError,
}

/// Structured error payload of a failed dispatch.
///
/// Serialized as one flat object: `message`, `type`, then the details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeError {
    /// Human readable message.
    pub message: String,
    /// Failure category.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Kind-specific fields (missing parameters, upstream payload, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl EnvelopeError {
    /// Creates an error without details.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            details: Map::new(),
        }
    }

    /// Adds a detail field.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Looks up a detail field.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

/// Result carried by a [`ResponseEnvelope`]: data or error, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Decoded upstream payload.
    Success(Value),
    /// Structured failure.
    Failure(EnvelopeError),
}

/// Uniform result of every dispatch.
///
/// Serialized as `{status, domain, action, method, path, data, error}` where
/// exactly one of `data`/`error` is meaningful and the other is `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    /// HTTP status, `0` for transport failures.
    pub status: u16,
    /// Dispatched domain.
    pub domain: String,
    /// Dispatched action.
    pub action: String,
    /// HTTP method, or `N/A`.
    pub method: String,
    /// Path template, or `N/A`.
    pub path: String,
    /// Data or error.
    pub outcome: Outcome,
}

impl ResponseEnvelope {
    /// Successful envelope for `operation`.
    pub fn success(status: u16, domain: &str, operation: &OperationMeta, data: Value) -> Self {
        Self::for_operation(status, domain, operation, Outcome::Success(data))
    }

    /// Failed envelope for `operation`.
    pub fn failure(
        status: u16,
        domain: &str,
        operation: &OperationMeta,
        error: EnvelopeError,
    ) -> Self {
        Self::for_operation(status, domain, operation, Outcome::Failure(error))
    }

    /// Failed envelope when no operation could be resolved.
    pub fn unresolved(status: u16, domain: &str, action: &str, error: EnvelopeError) -> Self {
        Self {
            status,
            domain: domain.to_string(),
            action: action.to_string(),
            method: NOT_AVAILABLE.to_string(),
            path: NOT_AVAILABLE.to_string(),
            outcome: Outcome::Failure(error),
        }
    }

    fn for_operation(
        status: u16,
        domain: &str,
        operation: &OperationMeta,
        outcome: Outcome,
    ) -> Self {
        Self {
            status,
            domain: domain.to_string(),
            action: operation.action.clone(),
            method: operation.method.clone(),
            path: operation.path.clone(),
            outcome,
        }
    }

    /// Whether the dispatch succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// The success payload.
    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    /// The failure payload.
    pub fn error(&self) -> Option<&EnvelopeError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }
}

#[derive(Serialize)]
struct FlatEnvelope<'a> {
    status: u16,
    domain: &'a str,
    action: &'a str,
    method: &'a str,
    path: &'a str,
    data: Option<&'a Value>,
    error: Option<&'a EnvelopeError>,
}

impl Serialize for ResponseEnvelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        FlatEnvelope {
            status: self.status,
            domain: &self.domain,
            action: &self.action,
            method: &self.method,
            path: &self.path,
            data: self.data(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}
