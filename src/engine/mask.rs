/// Sensitive-value masking for logged configuration
///
/// Anything written into the run's debug log passes through here first.
/// Mapping keys containing a sensitive term (case-insensitive) have their
/// values replaced with a fixed marker; the rule recurses through nested
/// mappings and sequences so secrets buried in structured config never
/// reach the log.

use serde_json::Value;

/// Marker substituted for masked values
pub const MASK_MARKER: &str = "[REDACTED]";

/// Key fragments that mark a value as sensitive
const SENSITIVE_TERMS: [&str; 8] = [
    "password",
    "token",
    "secret",
    "api key",
    "api_key",
    "credential",
    "auth",
    "private key",
];

/// Return a masked copy of `value`, leaving the original untouched
pub fn masked(value: &Value) -> Value {
    let mut copy = value.clone();
    mask_in_place(&mut copy);
    copy
}

fn mask_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *entry = Value::String(MASK_MARKER.to_string());
                } else {
                    mask_in_place(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                mask_in_place(item);
            }
        }
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_TERMS.iter().any(|term| key.contains(term))
}
