//! String utilities
//!
//! Helpers for printing resolved settings without leaking secret values.

use serde_json::Value as JsonValue;

const MASK: &str = "****";

/// Safely truncate a string at a character boundary
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Mask a secret, keeping at most `visible` leading characters.
///
/// Values no longer than twice `visible` are masked entirely so short
/// secrets are never mostly revealed.
///
/// # Example
/// ```
/// use aws_settings::utils::mask_secret;
///
/// assert_eq!(mask_secret("password1234", 2), "pa****");
/// assert_eq!(mask_secret("abc", 2), "****");
/// ```
pub fn mask_secret(s: &str, visible: usize) -> String {
    if s.chars().count() <= visible * 2 {
        MASK.to_string()
    } else {
        format!("{}{}", truncate_str(s, visible), MASK)
    }
}

/// Mask every string leaf of a JSON value in place
pub fn mask_json(value: &mut JsonValue, visible: usize) {
    match value {
        JsonValue::String(s) => *s = mask_secret(s, visible),
        JsonValue::Array(items) => items.iter_mut().for_each(|item| mask_json(item, visible)),
        JsonValue::Object(entries) => entries
            .values_mut()
            .for_each(|item| mask_json(item, visible)),
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) => {}
    }
}
