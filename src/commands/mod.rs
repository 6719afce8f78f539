//! IPC command handlers.
//!
//! Command names use snake_case derived from the frontend action names
//! (e.g. `catalog:query` -> `catalog_query`). Handlers parse loose JSON
//! payloads, delegate to their modules, and map `ClientError` to the
//! string the frontend displays.

pub mod auth;
pub mod bookings;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod runtime;

/// Pull a trimmed string out of an `arg0` payload that may be a bare
/// string or an object under any of the given keys.
pub(crate) fn payload_arg0_as_string(
    arg0: Option<serde_json::Value>,
    keys: &[&str],
) -> Option<String> {
    match arg0? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

pub(crate) fn payload_arg0_as_u32(arg0: &Option<serde_json::Value>, keys: &[&str]) -> Option<u32> {
    let value = arg0.as_ref()?;
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as u32),
        serde_json::Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_u64()))
            .map(|n| n as u32),
        _ => None,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
