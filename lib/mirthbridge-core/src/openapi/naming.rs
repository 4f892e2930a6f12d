use std::sync::LazyLock;

use regex::Regex;

/// Domain used for operations without any tag.
pub const UNTAGGED_DOMAIN: &str = "untagged";

static NON_ALPHANUMERIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("a valid regex"));

/// Path template placeholder `{name}`, the name captured as `name`.
pub(crate) static PATH_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?<name>[^}]+)}").expect("a valid regex"));

fn underscore_runs(value: &str) -> String {
    NON_ALPHANUMERIC_RUN
        .replace_all(value, "_")
        .trim_matches('_')
        .to_string()
}

/// Normalizes an OpenAPI tag into a domain token.
///
/// ```rust
/// use mirthbridge_core::normalize_domain;
///
/// assert_eq!(normalize_domain("Connector Services"), "connector_services");
/// assert_eq!(normalize_domain(" -- "), "untagged");
/// ```
pub fn normalize_domain(tag: &str) -> String {
    let normalized = underscore_runs(&tag.trim().to_lowercase());
    if normalized.is_empty() {
        UNTAGGED_DOMAIN.to_string()
    } else {
        normalized
    }
}

/// Builds the action identifier of an operation without `operationId`.
///
/// ```rust
/// use mirthbridge_core::fallback_action_id;
///
/// assert_eq!(
///     fallback_action_id("post", "/channels/{channelId}/messages"),
///     "post_channels_channelid_messages"
/// );
/// assert_eq!(fallback_action_id("GET", "/"), "get_root");
/// ```
pub fn fallback_action_id(method: &str, path: &str) -> String {
    let trimmed = path.trim_matches('/');
    let unwrapped = PATH_PLACEHOLDER.replace_all(trimmed, "$name");
    let mut cleaned = underscore_runs(&unwrapped).to_lowercase();
    if cleaned.is_empty() {
        cleaned.push_str("root");
    }
    format!("{}_{cleaned}", method.to_lowercase())
}
