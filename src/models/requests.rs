//! Request DTOs for the inspection API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Request body for `PUT /cache/:category/:key`
///
/// # Fields
/// - `value`: JSON form of the category's value type
/// - `ttl_ms`: Optional TTL in milliseconds (category default if absent, 0 = never expires)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

/// Request body for `POST /cache/:category/invalidate`
///
/// Without a prefix the whole category is invalidated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Validates a cache key taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}
