//! Utilities for sanitizing client-supplied values before they are stored.
//!
//! Request paths come straight from the network, so control characters are
//! removed and the length is capped before the path reaches the log store.

/// Maximum stored request path length in characters
pub const MAX_PATH_LENGTH: usize = 255;

/// Removes Unicode control characters (C0 0x00-0x1F, DEL 0x7F and C1
/// 0x80-0x9F) from `value`.
///
/// Unlike free-form text, request paths never legitimately contain tabs or
/// newlines, so those are removed too.
pub fn strip_control_chars(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

/// Sanitizes a request path and truncates it to `MAX_PATH_LENGTH` characters.
///
/// Truncation counts characters, not bytes, so multi-byte UTF-8 is never split.
pub fn sanitize_path(path: &str) -> String {
    let stripped = strip_control_chars(path);
    if stripped.chars().count() > MAX_PATH_LENGTH {
        stripped.chars().take(MAX_PATH_LENGTH).collect()
    } else {
        stripped
    }
}
