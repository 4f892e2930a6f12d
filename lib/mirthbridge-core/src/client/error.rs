use crate::envelope::ErrorKind;

/// Errors that can occur when using the [`ApiClient`](super::ApiClient).
///
/// They never cross the dispatch boundary: [`ApiClient::execute_operation`](super::ApiClient::execute_operation)
/// turns them into envelopes through [`ApiClientError::kind`].
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum ApiClientError {
    /// HTTP client error from the underlying reqwest library.
    ///
    /// Covers connection failures and timeouts.
    ReqwestError(reqwest::Error),

    /// URL parsing error when constructing request URLs.
    UrlError(url::ParseError),

    /// Invalid HTTP header name in the header overrides.
    InvalidHeaderName(http::header::InvalidHeaderName),

    /// Invalid HTTP header value in the header overrides.
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// The operation method is not a valid HTTP method.
    InvalidMethod(http::method::InvalidMethod),

    /// JSON serialization error of the request body.
    JsonValueError(serde_json::Error),

    /// Form or query serialization error.
    QuerySerializationError(serde_urlencoded::ser::Error),

    /// The session endpoint rejected the credentials.
    #[display("Login failed with status {status}")]
    #[from(skip)]
    AuthenticationFailed {
        /// Status returned by the session endpoint.
        status: u16,
    },

    /// Path template contains placeholders without value.
    #[display("Missing path param: {}", missing.join(", "))]
    #[from(skip)]
    PathUnresolved {
        /// The path template that couldn't be resolved.
        path: String,
        /// Names of the unresolved placeholders.
        missing: Vec<String>,
    },

    /// Invalid base URL configuration.
    #[display("Invalid base URL '{url}': {error}")]
    #[from(skip)]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        error: String,
    },

    /// The client was built without credentials.
    #[display("Missing credentials: set a username and a password")]
    #[from(skip)]
    MissingCredentials,
}

impl ApiClientError {
    /// Envelope error category matching this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReqwestError(error) if error.is_timeout() => ErrorKind::Timeout,
            Self::ReqwestError(_) => ErrorKind::TransportError,
            Self::AuthenticationFailed { .. } | Self::MissingCredentials => ErrorKind::AuthError,
            Self::UrlError(_)
            | Self::InvalidHeaderName(_)
            | Self::InvalidHeaderValue(_)
            | Self::InvalidMethod(_)
            | Self::JsonValueError(_)
            | Self::QuerySerializationError(_)
            | Self::PathUnresolved { .. }
            | Self::InvalidBaseUrl { .. } => ErrorKind::ValidationError,
        }
    }

    /// Whether the error happened before any HTTP status was received.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::TransportError)
    }
}
