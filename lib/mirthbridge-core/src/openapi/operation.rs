use std::collections::BTreeSet;

use serde::Serialize;

/// One REST operation extracted from the OpenAPI document.
///
/// Instances are created once while building the
/// [`OpenApiRegistry`](super::OpenApiRegistry) and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationMeta {
    /// Normalized domain token (see [`normalize_domain`](super::normalize_domain)).
    pub domain: String,
    /// Tag text the domain was derived from.
    pub tag: String,
    /// Action identifier, unique within the domain.
    pub action: String,
    /// Operation identifier exposed to callers, same value as `action`.
    pub operation_id: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Path template with `{param}` placeholders.
    pub path: String,
    /// Operation summary.
    pub summary: String,
    /// Operation description.
    pub description: String,
    /// Names of the required path parameters.
    pub required_path_params: BTreeSet<String>,
    /// Names of the required query parameters.
    pub required_query_params: BTreeSet<String>,
    /// Whether the request body is required.
    pub body_required: bool,
    /// Accepted request media types, sorted.
    pub request_media_types: Vec<String>,
    /// Declared top-level types of the request body schemas.
    pub body_schema_types: BTreeSet<String>,
    /// Required top-level fields of object request bodies.
    pub body_required_fields: BTreeSet<String>,
}

impl OperationMeta {
    /// Returns the caller-facing description of this operation.
    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            action: self.action.clone(),
            operation_id: self.operation_id.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            summary: self.summary.clone(),
            required_path_params: self.required_path_params.iter().cloned().collect(),
            required_query_params: self.required_query_params.iter().cloned().collect(),
            body_required: self.body_required,
            request_media_types: self.request_media_types.clone(),
            body_schema_types: self.body_schema_types.iter().cloned().collect(),
            body_required_fields: self.body_required_fields.iter().cloned().collect(),
        }
    }

    /// Whether the operation expects a JSON object as body.
    pub fn expects_object_body(&self) -> bool {
        self.body_schema_types.contains("object")
    }
}

/// Public listing entry of an operation, as returned by
/// [`OpenApiRegistry::list_actions`](super::OpenApiRegistry::list_actions).
///
/// All collections are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSummary {
    /// Action identifier.
    pub action: String,
    /// Operation identifier.
    pub operation_id: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Path template.
    pub path: String,
    /// Operation summary.
    pub summary: String,
    /// Required path parameters.
    pub required_path_params: Vec<String>,
    /// Required query parameters.
    pub required_query_params: Vec<String>,
    /// Whether a body is required.
    pub body_required: bool,
    /// Accepted request media types.
    pub request_media_types: Vec<String>,
    /// Declared body schema types.
    pub body_schema_types: Vec<String>,
    /// Required body fields.
    pub body_required_fields: Vec<String>,
}
