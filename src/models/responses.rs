//! Response DTOs for the inspection API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::manager::CacheKind;

/// Response body for `GET /cache/:category/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub category: CacheKind,
    pub key: String,
    pub value: serde_json::Value,
}

/// Response body for `PUT /cache/:category/:key`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    pub category: CacheKind,
    pub key: String,
}

impl SetResponse {
    pub fn new(category: CacheKind, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set in {}", key, category),
            category,
            key,
        }
    }
}

/// Response body for `DELETE /cache/:category/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub category: CacheKind,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(category: CacheKind, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted from {}", key, category),
            category,
            key,
        }
    }
}

/// Response body for clear and invalidate endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    /// Category affected, None when every category was cleared
    pub category: Option<CacheKind>,
    /// Number of in-memory entries removed
    pub removed: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Whether caching is currently enabled
    pub cache_enabled: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(cache_enabled: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            cache_enabled,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
