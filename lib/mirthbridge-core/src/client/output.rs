use serde_json::Value;
use tracing::debug;

/// Decodes a response body into an envelope payload.
///
/// An empty body yields `null`, a JSON body its value, anything else the
/// raw text.
pub(super) fn decode_payload(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "response body is not JSON, keeping raw text");
            Value::String(String::from_utf8_lossy(body).into_owned())
        }
    }
}
