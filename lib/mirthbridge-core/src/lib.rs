//! # Mirthbridge Core
//!
//! Expose the NextGen Connect (Mirth Connect) REST API as a set of callable
//! tools, driven by its OpenAPI document.
//!
//! The crate is organized around four pieces:
//! - **[`OpenApiRegistry`]** - indexes the OpenAPI document into domains and actions
//! - **[`Dispatcher`]** - validates an [`InvocationEnvelope`] against the registry
//! - **[`ApiClient`]** - sends validated requests, keeping the login session alive
//! - **[`ToolHost`]** - the discovery and per-domain tools offered to an agent runtime
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mirthbridge_core::{ApiClientBuilder, BridgeConfig, Dispatcher, OpenApiRegistry, ToolHost};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::from_env()?;
//! let registry = Arc::new(OpenApiRegistry::load(&config.openapi_path)?);
//! let client = ApiClientBuilder::from_config(&config).build()?;
//!
//! let host = ToolHost::new(Dispatcher::new(registry, client));
//! let envelope = host
//!     .call_domain_tool(
//!         "channels",
//!         json!({ "action": "getChannel", "path_params": { "channelId": "42" } }),
//!     )
//!     .await?;
//!
//! println!("{}", serde_json::to_string_pretty(&envelope)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Envelopes
//!
//! Every dispatch returns exactly one [`ResponseEnvelope`], serialized as
//! `{status, domain, action, method, path, data, error}`. Failures never
//! surface as `Err`: the error object carries a `message` and a `type`
//! (see [`ErrorKind`]), plus kind-specific fields.
//!
//! | Type | Status |
//! |---|---|
//! | `unknown_action` | 404 |
//! | `validation_error` | 400 |
//! | `unsupported_media_type` | 415 |
//! | `malformed_body` | 400 |
//! | `auth_error` | 401, or the rejected call's status on re-login |
//! | `timeout` | 0 |
//! | `transport_error` | 0 |
//! | `upstream_error` | upstream status |
//!
//! ## Error Handling
//!
//! Only startup can fail:
//! - [`ConfigError`] - missing or invalid environment values
//! - [`RegistryError`] - unreadable or invalid OpenAPI document
//! - [`ApiClientError`] - HTTP client construction
//! - [`ToolError`] - unknown tool or undecodable tool arguments

mod client;
pub mod config;
mod dispatch;
mod envelope;
mod openapi;
pub mod tools;

pub use self::client::{
    ApiClient, ApiClientBuilder, ApiClientError, Credentials, LOGIN_PATH, SecureString,
};
pub use self::config::{BridgeConfig, ConfigError, Transport};
pub use self::dispatch::{Dispatcher, OperationExecutor, ProgressReporter, TracingProgress};
pub use self::envelope::{
    EnvelopeError, ErrorKind, InvocationEnvelope, NOT_AVAILABLE, Outcome, ResponseEnvelope,
    TRANSPORT_FAILURE_STATUS,
};
pub use self::openapi::{
    DomainInfo, HTTP_METHODS, MAX_REF_DEPTH, OpenApiRegistry, OperationMeta, OperationSummary,
    RegistryError, SpecResolver, UNTAGGED_DOMAIN, fallback_action_id, normalize_domain,
};
pub use self::tools::{ActionListing, ToolArguments, ToolDescriptor, ToolError, ToolHost};
