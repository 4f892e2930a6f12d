use std::sync::atomic::{AtomicBool, Ordering};

use headers::{ContentType, HeaderMapExt};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::{debug, info, warn};
use url::Url;

mod builder;
pub use self::builder::ApiClientBuilder;

mod auth;
pub use self::auth::{Credentials, SecureString};

mod error;
pub use self::error::ApiClientError;

mod output;
mod path;

use crate::dispatch::OperationExecutor;
use crate::envelope::{
    EnvelopeError, ErrorKind, InvocationEnvelope, ResponseEnvelope, TRANSPORT_FAILURE_STATUS,
};
use crate::openapi::OperationMeta;

/// Session endpoint receiving the login form.
pub const LOGIN_PATH: &str = "/users/_login";

/// Status returned when the first login is rejected.
const LOGIN_REJECTED_STATUS: u16 = 401;

/// HTTP client bound to one NextGen Connect server.
///
/// The client keeps a cookie-based session: it logs in lazily before the
/// first call and once more whenever the server answers `401` or `403`.
/// Use [`ApiClientBuilder`] to create instances.
///
/// # Example
///
/// ```rust,no_run
/// use mirthbridge_core::{ApiClient, InvocationEnvelope, OpenApiRegistry};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = OpenApiRegistry::load("openapi/openapi.json")?;
/// let client = ApiClient::builder()
///     .with_base_url("https://localhost:8443/api")
///     .with_username("admin")
///     .with_password("admin")
///     .build()?;
///
/// if let Some(operation) = registry.get_operation("channels", "getChannels") {
///     let invocation = InvocationEnvelope::new("getChannels");
///     let envelope = client.execute_operation("channels", operation, &invocation).await;
///     println!("{}", envelope.status);
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// The `authenticated` flag is advisory: concurrent calls hitting an expired
/// session may each log in again.
#[derive(Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    authenticated: AtomicBool,
}

// Create
impl ApiClient {
    /// Starts building a client.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Base URL requests are sent to, without trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the last login succeeded and no `401`/`403` was seen since.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }
}

// Session
impl ApiClient {
    /// Posts the credentials to the session endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::AuthenticationFailed`] when the server answers
    /// with a status of 400 or more, or the transport error when no answer
    /// was received. The client is unauthenticated afterwards in both cases.
    pub async fn login(&self) -> Result<(), ApiClientError> {
        let result = self.send_login().await;
        self.authenticated.store(result.is_ok(), Ordering::Release);
        match &result {
            Ok(()) => info!(username = %self.credentials.username, "logged in"),
            Err(error) => warn!(username = %self.credentials.username, %error, "login failed"),
        }
        result
    }

    async fn send_login(&self) -> Result<(), ApiClientError> {
        let mut headers = HeaderMap::new();
        headers.typed_insert(ContentType::form_url_encoded());
        let body = self.credentials.to_form()?;

        let response = self
            .client
            .post(self.url(LOGIN_PATH)?)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ApiClientError::AuthenticationFailed {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn ensure_session(&self) -> Result<(), ApiClientError> {
        if self.is_authenticated() {
            return Ok(());
        }
        self.login().await
    }
}

// Execute
impl ApiClient {
    /// Sends `invocation` to the remote API and normalizes the outcome.
    ///
    /// Every failure is reported inside the envelope:
    /// - login rejected: `auth_error`, with status 401 on the first login and
    ///   the rejected call's status on re-login
    /// - unresolved path placeholder: `validation_error` with status 400
    /// - no answer: `timeout` or `transport_error` with status 0
    /// - non-2xx answer: `upstream_error` carrying the decoded payload
    ///
    /// A `401`/`403` answer triggers a single re-login followed by a single
    /// resend.
    pub async fn execute_operation(
        &self,
        domain: &str,
        operation: &OperationMeta,
        invocation: &InvocationEnvelope,
    ) -> ResponseEnvelope {
        if let Err(error) = self.ensure_session().await {
            return login_failure(domain, operation, &error, LOGIN_REJECTED_STATUS);
        }

        let path = match path::resolve_path(&operation.path, &invocation.path_params) {
            Ok(path) => path,
            Err(error) => return request_failure(domain, operation, &error),
        };

        let mut retried = false;
        loop {
            let response = match self.send(operation, &path, invocation).await {
                Ok(response) => response,
                Err(error) => return request_failure(domain, operation, &error),
            };

            let status = response.status().as_u16();
            debug!(%domain, action = %operation.action, status, "response received");

            if matches!(status, 401 | 403) && !retried {
                retried = true;
                self.authenticated.store(false, Ordering::Release);
                warn!(
                    %domain,
                    action = %operation.action,
                    status,
                    "session rejected, logging in again"
                );
                if let Err(error) = self.login().await {
                    return login_failure(domain, operation, &error, status);
                }
                continue;
            }

            let payload = match response.bytes().await {
                Ok(body) => output::decode_payload(&body),
                Err(error) => return request_failure(domain, operation, &error.into()),
            };

            if (200..300).contains(&status) {
                return ResponseEnvelope::success(status, domain, operation, payload);
            }
            let error = EnvelopeError::new(ErrorKind::UpstreamError, "Upstream API error")
                .with_detail("payload", payload);
            return ResponseEnvelope::failure(status, domain, operation, error);
        }
    }

    async fn send(
        &self,
        operation: &OperationMeta,
        path: &str,
        invocation: &InvocationEnvelope,
    ) -> Result<reqwest::Response, ApiClientError> {
        let method = Method::from_bytes(operation.method.as_bytes())?;
        let mut url = self.url(path)?;
        if !invocation.query.is_empty() {
            let query = path::query_string(&invocation.query)?;
            url.set_query(Some(&query));
        }

        let mut headers = HeaderMap::new();
        let mut request = self.client.request(method, url);
        if let Some(body) = &invocation.body {
            headers.typed_insert(ContentType::json());
            request = request.body(serde_json::to_vec(body)?);
        }
        for (name, value) in &invocation.headers_override {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            let value = HeaderValue::from_str(value)?;
            headers.insert(name, value);
        }

        debug!(method = %operation.method, %path, "sending request");
        let response = request.headers(headers).send().await?;
        Ok(response)
    }

    fn url(&self, path: &str) -> Result<Url, ApiClientError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&url)?)
    }
}

impl OperationExecutor for ApiClient {
    async fn execute_operation(
        &self,
        domain: &str,
        operation: &OperationMeta,
        invocation: &InvocationEnvelope,
    ) -> ResponseEnvelope {
        Self::execute_operation(self, domain, operation, invocation).await
    }
}

fn login_failure(
    domain: &str,
    operation: &OperationMeta,
    error: &ApiClientError,
    rejected_status: u16,
) -> ResponseEnvelope {
    if error.is_transport() {
        return request_failure(domain, operation, error);
    }
    let status = match error {
        ApiClientError::AuthenticationFailed { .. } => rejected_status,
        _ => LOGIN_REJECTED_STATUS,
    };
    let error = EnvelopeError::new(ErrorKind::AuthError, error.to_string());
    ResponseEnvelope::failure(status, domain, operation, error)
}

fn request_failure(
    domain: &str,
    operation: &OperationMeta,
    error: &ApiClientError,
) -> ResponseEnvelope {
    let status = if error.is_transport() {
        TRANSPORT_FAILURE_STATUS
    } else {
        400
    };
    warn!(%domain, action = %operation.action, %error, kind = %error.kind(), "request failed");
    let envelope_error = EnvelopeError::new(error.kind(), error.to_string());
    ResponseEnvelope::failure(status, domain, operation, envelope_error)
}
