//! OpenAPI document indexing.
//!
//! The document is consumed as a plain [`serde_json::Value`]: only the parts
//! needed to validate invocations are extracted (tags, operation ids,
//! required parameters and request body hints).

mod naming;
pub use self::naming::{UNTAGGED_DOMAIN, fallback_action_id, normalize_domain};
pub(crate) use self::naming::PATH_PLACEHOLDER;

mod operation;
pub use self::operation::{OperationMeta, OperationSummary};

mod registry;
pub use self::registry::{DomainInfo, HTTP_METHODS, OpenApiRegistry, RegistryError};

mod resolver;
pub use self::resolver::{MAX_REF_DEPTH, SpecResolver};
