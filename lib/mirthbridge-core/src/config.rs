//! Runtime configuration read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `MIRTH_BASE_URL` | required |
//! | `MIRTH_USERNAME` | required |
//! | `MIRTH_PASSWORD` | required |
//! | `MIRTH_VERIFY_SSL` | `true` |
//! | `MIRTH_TIMEOUT_SECONDS` | `30` |
//! | `MCP_TRANSPORT` | `stdio` |
//! | `MCP_HTTP_HOST` | `127.0.0.1` |
//! | `MCP_HTTP_PORT` | `8000` |
//! | `MIRTH_OPENAPI_PATH` | `openapi/openapi.json` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::SecureString;

/// Remote API base URL.
pub const BASE_URL_VAR: &str = "MIRTH_BASE_URL";
/// Login name.
pub const USERNAME_VAR: &str = "MIRTH_USERNAME";
/// Login password.
pub const PASSWORD_VAR: &str = "MIRTH_PASSWORD";
/// TLS certificate verification flag.
pub const VERIFY_SSL_VAR: &str = "MIRTH_VERIFY_SSL";
/// Per-request timeout, in seconds.
pub const TIMEOUT_VAR: &str = "MIRTH_TIMEOUT_SECONDS";
/// Tool transport.
pub const TRANSPORT_VAR: &str = "MCP_TRANSPORT";
/// Listening host of the HTTP transport.
pub const HTTP_HOST_VAR: &str = "MCP_HTTP_HOST";
/// Listening port of the HTTP transport.
pub const HTTP_PORT_VAR: &str = "MCP_HTTP_PORT";
/// Location of the OpenAPI document.
pub const OPENAPI_PATH_VAR: &str = "MIRTH_OPENAPI_PATH";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 8000;
const DEFAULT_OPENAPI_PATH: &str = "openapi/openapi.json";

/// Errors raised while reading the configuration.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[display("Missing required environment variable: {name}. Set {name} before starting the server.")]
    Missing {
        /// Variable name.
        name: &'static str,
    },

    /// A variable holds an unusable value.
    #[display("{name} {expected}.")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What the value should look like.
        expected: &'static str,
    },

    /// The OpenAPI document does not exist.
    #[display(
        "OpenAPI file not found: {}. Set MIRTH_OPENAPI_PATH to a valid OpenAPI JSON file.",
        path.display()
    )]
    OpenApiNotFound {
        /// Resolved location.
        path: PathBuf,
    },
}

/// How tools are exposed to the agent runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum Transport {
    /// Line framed over stdin/stdout.
    #[default]
    #[display("stdio")]
    Stdio,
    /// Streamable HTTP.
    #[display("streamable-http")]
    StreamableHttp,
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "streamable-http" | "http" => Ok(Self::StreamableHttp),
            _ => Err(ConfigError::Invalid {
                name: TRANSPORT_VAR,
                expected: "must be one of: stdio, streamable-http, http",
            }),
        }
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Remote API base URL, without trailing `/`.
    pub base_url: String,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: SecureString,
    /// Whether TLS certificates are verified.
    pub verify_ssl: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Tool transport.
    pub transport: Transport,
    /// Listening host of the HTTP transport.
    pub http_host: String,
    /// Listening port of the HTTP transport.
    pub http_port: u16,
    /// Location of the OpenAPI document.
    pub openapi_path: PathBuf,
}

impl BridgeConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails on a missing or invalid variable, or when the OpenAPI document
    /// does not exist.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing { name })
        };
        let optional = |name: &'static str, default: &str| {
            lookup(name)
                .map_or_else(|| default.to_string(), |value| value.trim().to_string())
        };

        let base_url = required(BASE_URL_VAR)?;
        let username = required(USERNAME_VAR)?;
        let password = required(PASSWORD_VAR)?;
        let verify_ssl = lookup(VERIFY_SSL_VAR)
            .map(|value| parse_bool(VERIFY_SSL_VAR, &value))
            .transpose()?
            .unwrap_or(true);

        let timeout = optional(TIMEOUT_VAR, &DEFAULT_TIMEOUT_SECONDS.to_string())
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
            .ok_or(ConfigError::Invalid {
                name: TIMEOUT_VAR,
                expected: "must be a positive number",
            })?;

        let transport = optional(TRANSPORT_VAR, "stdio").parse::<Transport>()?;
        let http_host = optional(HTTP_HOST_VAR, DEFAULT_HTTP_HOST);
        let http_port = optional(HTTP_PORT_VAR, &DEFAULT_HTTP_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid {
                name: HTTP_PORT_VAR,
                expected: "must be an integer",
            })?;

        let openapi_path = PathBuf::from(optional(OPENAPI_PATH_VAR, DEFAULT_OPENAPI_PATH));
        let openapi_path = openapi_path.canonicalize().map_err(|_| ConfigError::OpenApiNotFound {
            path: openapi_path.clone(),
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password: password.into(),
            verify_ssl,
            timeout,
            transport,
            http_host,
            http_port,
            openapi_path,
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "must be a boolean (true/false)",
        }),
    }
}

/// Default timeout applied when none is configured.
pub const fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn fixture_document() -> String {
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/openapi.json").to_string()
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let mut vars = vars
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        vars.entry(OPENAPI_PATH_VAR.to_string())
            .or_insert_with(fixture_document);
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (BASE_URL_VAR, "https://mirth.example.test/api/"),
        (USERNAME_VAR, " admin "),
        (PASSWORD_VAR, "admin"),
    ];

    #[test]
    fn should_apply_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&REQUIRED)).expect("valid config");

        assert_eq!(config.base_url, "https://mirth.example.test/api");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password.as_str(), "admin");
        assert!(config.verify_ssl);
        assert_eq!(config.timeout, default_timeout());
        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.http_host, "127.0.0.1");
        assert_eq!(config.http_port, 8000);
        assert!(config.openapi_path.is_absolute());
    }

    #[test]
    fn should_read_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            (VERIFY_SSL_VAR, "off"),
            (TIMEOUT_VAR, "2.5"),
            (TRANSPORT_VAR, "HTTP"),
            (HTTP_HOST_VAR, "0.0.0.0"),
            (HTTP_PORT_VAR, "9090"),
        ]);

        let config = BridgeConfig::from_lookup(lookup(&vars)).expect("valid config");

        assert!(!config.verify_ssl);
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.transport, Transport::StreamableHttp);
        assert_eq!(config.http_host, "0.0.0.0");
        assert_eq!(config.http_port, 9090);
    }

    #[rstest]
    #[case(BASE_URL_VAR)]
    #[case(USERNAME_VAR)]
    #[case(PASSWORD_VAR)]
    fn should_require_credentials_and_url(#[case] missing: &'static str) {
        let mut vars = REQUIRED.to_vec();
        vars.retain(|(name, _)| *name != missing);
        vars.push((missing, "   "));

        let error = BridgeConfig::from_lookup(lookup(&vars)).expect_err("invalid config");

        assert_eq!(error, ConfigError::Missing { name: missing });
    }

    #[rstest]
    #[case(VERIFY_SSL_VAR, "maybe", "MIRTH_VERIFY_SSL must be a boolean (true/false).")]
    #[case(TIMEOUT_VAR, "-1", "MIRTH_TIMEOUT_SECONDS must be a positive number.")]
    #[case(TIMEOUT_VAR, "soon", "MIRTH_TIMEOUT_SECONDS must be a positive number.")]
    #[case(TRANSPORT_VAR, "grpc", "MCP_TRANSPORT must be one of: stdio, streamable-http, http.")]
    #[case(HTTP_PORT_VAR, "eighty", "MCP_HTTP_PORT must be an integer.")]
    fn should_reject_invalid_values(
        #[case] name: &'static str,
        #[case] value: &'static str,
        #[case] message: &str,
    ) {
        let mut vars = REQUIRED.to_vec();
        vars.push((name, value));

        let error = BridgeConfig::from_lookup(lookup(&vars)).expect_err("invalid config");

        assert_eq!(error.to_string(), message);
    }

    #[test]
    fn should_reject_missing_openapi_document() {
        let mut vars = REQUIRED.to_vec();
        vars.push((OPENAPI_PATH_VAR, "/definitely/not/here/openapi.json"));

        let error = BridgeConfig::from_lookup(lookup(&vars)).expect_err("invalid config");

        assert!(matches!(error, ConfigError::OpenApiNotFound { .. }));
    }
}
