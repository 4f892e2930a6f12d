use std::collections::BTreeSet;

use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use super::ApiClientError;
use crate::openapi::PATH_PLACEHOLDER;

/// Characters escaped inside a path segment, everything but RFC 3986 unreserved ones.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_path_param_value(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Renders a parameter value as text: strings verbatim, other values as JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Substitutes every `{name}` placeholder of `template` with its percent-encoded value.
///
/// # Errors
///
/// Returns [`ApiClientError::PathUnresolved`] listing every placeholder without value.
pub(super) fn resolve_path(
    template: &str,
    params: &IndexMap<String, Value>,
) -> Result<String, ApiClientError> {
    let missing = PATH_PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.name("name"))
        .map(|name| name.as_str())
        .filter(|name| !params.contains_key(*name))
        .map(String::from)
        .collect::<BTreeSet<_>>();
    if !missing.is_empty() {
        return Err(ApiClientError::PathUnresolved {
            path: template.to_string(),
            missing: missing.into_iter().collect(),
        });
    }

    let resolved = PATH_PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        caps.name("name")
            .and_then(|name| params.get(name.as_str()))
            .map(|value| encode_path_param_value(&render_value(value)))
            .unwrap_or_default()
    });
    Ok(resolved.into_owned())
}

/// Encodes query parameters.
///
/// Arrays become repeated keys, `null` an empty value and objects their JSON text.
pub(super) fn query_string(query: &IndexMap<String, Value>) -> Result<String, ApiClientError> {
    let mut pairs = Vec::with_capacity(query.len());
    for (name, value) in query {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (name.as_str(), query_value(item))));
            }
            other => pairs.push((name.as_str(), query_value(other))),
        }
    }
    let encoded = serde_urlencoded::to_string(pairs)?;
    Ok(encoded)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => render_value(other),
    }
}
