use std::sync::atomic::AtomicBool;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::{ApiClient, ApiClientError, Credentials, SecureString};
use crate::config::{BridgeConfig, default_timeout};

/// Header sent on every request, required by the NextGen Connect API.
const REQUESTED_WITH: &str = "x-requested-with";
const REQUESTED_WITH_VALUE: &str = "OpenAPI";

/// Builder for [`ApiClient`] instances.
///
/// # Default Configuration
///
/// - **Timeout**: 30 seconds per request
/// - **TLS verification**: enabled
/// - **Base URL** and **credentials**: required
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use mirthbridge_core::ApiClient;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::builder()
///     .with_base_url("https://localhost:8443/api")
///     .with_username("admin")
///     .with_password("admin")
///     .with_timeout(Duration::from_secs(10))
///     .with_verify_tls(false)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<SecureString>,
    timeout: Duration,
    verify_tls: bool,
}

impl ApiClientBuilder {
    /// Seeds a builder from the runtime configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::default()
            .with_base_url(config.base_url.clone())
            .with_username(config.username.clone())
            .with_password(config.password.clone())
            .with_timeout(config.timeout)
            .with_verify_tls(config.verify_ssl)
    }

    /// Builds the final `ApiClient`.
    ///
    /// No request is sent: the session is opened lazily by the first call.
    ///
    /// # Errors
    ///
    /// This method can fail if:
    /// - The base URL is missing or is not an absolute `http`/`https` URL
    /// - The username or the password is missing
    /// - The underlying HTTP client cannot be initialized
    pub fn build(self) -> Result<ApiClient, ApiClientError> {
        let Self {
            base_url,
            username,
            password,
            timeout,
            verify_tls,
        } = self;

        let base_url = base_url.unwrap_or_default();
        let parsed = Url::parse(&base_url).map_err(|error| ApiClientError::InvalidBaseUrl {
            url: base_url.clone(),
            error: error.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiClientError::InvalidBaseUrl {
                url: base_url,
                error: "only http and https are supported".to_string(),
            });
        }

        let (Some(username), Some(password)) = (username, password) else {
            return Err(ApiClientError::MissingCredentials);
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(REQUESTED_WITH),
            HeaderValue::from_static(REQUESTED_WITH_VALUE),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Credentials { username, password },
            authenticated: AtomicBool::new(false),
        })
    }

    /// Sets the API base URL, such as `https://localhost:8443/api`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets both the username and the password.
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        self.with_username(credentials.username.clone())
            .with_password(credentials.password.clone())
    }

    /// Sets the login name.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the login password.
    pub fn with_password(mut self, password: impl Into<SecureString>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the per-request timeout, login included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables TLS certificate verification.
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            timeout: default_timeout(),
            verify_tls: true,
        }
    }
}
