//! Static validation of invocations and delegation to the executor.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::envelope::{EnvelopeError, ErrorKind, InvocationEnvelope, ResponseEnvelope};
use crate::openapi::{OpenApiRegistry, OperationMeta};

/// Executes a validated invocation against the remote API.
///
/// Implemented by [`ApiClient`](crate::ApiClient). The dispatcher only calls
/// it once every static check passed.
pub trait OperationExecutor: Send + Sync {
    /// Runs the operation and normalizes the outcome.
    fn execute_operation(
        &self,
        domain: &str,
        operation: &OperationMeta,
        invocation: &InvocationEnvelope,
    ) -> impl Future<Output = ResponseEnvelope> + Send;
}

impl<E> OperationExecutor for Arc<E>
where
    E: OperationExecutor,
{
    fn execute_operation(
        &self,
        domain: &str,
        operation: &OperationMeta,
        invocation: &InvocationEnvelope,
    ) -> impl Future<Output = ResponseEnvelope> + Send {
        E::execute_operation(self, domain, operation, invocation)
    }
}

/// Receives progress messages emitted while dispatching.
pub trait ProgressReporter: Send + Sync {
    /// Reports an informational message.
    fn info(&self, message: &str) -> impl Future<Output = ()> + Send;
}

/// Reports progress through `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    async fn info(&self, message: &str) {
        info!(target: "mirthbridge::progress", "{message}");
    }
}

struct Silent;

impl ProgressReporter for Silent {
    async fn info(&self, _message: &str) {}
}

/// Validates invocations against the registry before handing them to an
/// [`OperationExecutor`].
///
/// Validation failures are returned as envelopes and never reach the
/// executor.
#[derive(Debug)]
pub struct Dispatcher<E> {
    registry: Arc<OpenApiRegistry>,
    executor: E,
}

impl<E> Clone for Dispatcher<E>
where
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            executor: self.executor.clone(),
        }
    }
}

impl<E> Dispatcher<E>
where
    E: OperationExecutor,
{
    /// Creates a dispatcher.
    pub fn new(registry: Arc<OpenApiRegistry>, executor: E) -> Self {
        Self { registry, executor }
    }

    /// The registry used for lookups.
    pub fn registry(&self) -> &OpenApiRegistry {
        &self.registry
    }

    /// The executor invoked once validation passed.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Validates then executes `invocation` against `domain`.
    pub async fn dispatch(&self, domain: &str, invocation: InvocationEnvelope) -> ResponseEnvelope {
        self.run(domain, invocation, None::<&Silent>).await
    }

    /// Same as [`dispatch`](Self::dispatch), reporting progress to `progress`.
    pub async fn dispatch_with_progress<P>(
        &self,
        domain: &str,
        invocation: InvocationEnvelope,
        progress: &P,
    ) -> ResponseEnvelope
    where
        P: ProgressReporter,
    {
        self.run(domain, invocation, Some(progress)).await
    }

    async fn run<P>(
        &self,
        domain: &str,
        invocation: InvocationEnvelope,
        progress: Option<&P>,
    ) -> ResponseEnvelope
    where
        P: ProgressReporter,
    {
        let action = invocation.action.as_str();
        let Some(operation) = self.registry.get_operation(domain, action) else {
            debug!(%domain, %action, "unknown action");
            let error = EnvelopeError::new(
                ErrorKind::UnknownAction,
                format!("Unknown action '{action}' for domain '{domain}'."),
            )
            .with_detail("suggestion", "Call list_actions(domain) for valid actions.");
            return ResponseEnvelope::unresolved(404, domain, action, error);
        };

        if let Some(rejection) = validate(domain, operation, &invocation) {
            debug!(%domain, %action, status = rejection.status, "invocation rejected");
            return rejection;
        }

        if let Some(progress) = progress {
            let message = format!(
                "Dispatching {domain}.{action} -> {} {}",
                operation.method, operation.path
            );
            progress.info(&message).await;
        }

        self.executor
            .execute_operation(domain, operation, &invocation)
            .await
    }
}

fn validate(
    domain: &str,
    operation: &OperationMeta,
    invocation: &InvocationEnvelope,
) -> Option<ResponseEnvelope> {
    let missing_path = operation
        .required_path_params
        .iter()
        .filter(|name| !invocation.path_params.contains_key(name.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    let missing_query = operation
        .required_query_params
        .iter()
        .filter(|name| !invocation.query.contains_key(name.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    let missing_body = operation.body_required && invocation.body.is_none();

    if !missing_path.is_empty() || !missing_query.is_empty() || missing_body {
        let error = EnvelopeError::new(
            ErrorKind::ValidationError,
            "Validation failed for invocation envelope.",
        )
        .with_detail("missing_path_params", missing_path)
        .with_detail("missing_query_params", missing_query)
        .with_detail("body_required", operation.body_required);
        return Some(ResponseEnvelope::failure(400, domain, operation, error));
    }

    if !operation.request_media_types.is_empty()
        && let Some(provided) = invocation.content_type()
        && !provided.is_empty()
        && !operation.request_media_types.iter().any(|allowed| allowed == provided)
    {
        let error = EnvelopeError::new(
            ErrorKind::UnsupportedMediaType,
            "Unsupported Content-Type for this action.",
        )
        .with_detail("allowed", operation.request_media_types.clone())
        .with_detail("provided", provided);
        return Some(ResponseEnvelope::failure(415, domain, operation, error));
    }

    let body = invocation.body.as_ref()?;
    if operation.body_schema_types.is_empty() {
        return None;
    }

    if operation.expects_object_body() && !body.is_object() {
        let error = EnvelopeError::new(
            ErrorKind::MalformedBody,
            "Malformed body payload: expected object.",
        )
        .with_detail(
            "expected_types",
            operation.body_schema_types.iter().cloned().collect::<Vec<_>>(),
        );
        return Some(ResponseEnvelope::failure(400, domain, operation, error));
    }

    if let Value::Object(fields) = body
        && !operation.body_required_fields.is_empty()
    {
        let missing_fields = operation
            .body_required_fields
            .iter()
            .filter(|field| !fields.contains_key(field.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        if !missing_fields.is_empty() {
            let error = EnvelopeError::new(
                ErrorKind::MalformedBody,
                "Malformed body payload: missing required fields.",
            )
            .with_detail("missing_body_fields", missing_fields);
            return Some(ResponseEnvelope::failure(400, domain, operation, error));
        }
    }

    None
}
