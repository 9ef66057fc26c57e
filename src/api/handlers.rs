//! API Handlers
//!
//! HTTP request handlers for the cache inspection endpoints. Path segments
//! name a category at runtime; each handler dispatches to the typed manager
//! call of that category.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::manager::{with_category, CacheKind, CacheManager, InvalidatePredicate, ManagerStats};
use crate::models::{
    validate_key, DeleteResponse, GetResponse, HealthResponse, InvalidateRequest,
    RemovedResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache manager
    pub manager: Arc<CacheManager>,
}

impl AppState {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    /// Creates an AppState with a memory-only manager.
    pub fn from_config(config: CacheConfig) -> Self {
        Self::new(Arc::new(CacheManager::new(config)))
    }
}

/// Parses the category segment and checks that it can serve requests.
async fn resolve_category(state: &AppState, raw: &str) -> Result<CacheKind> {
    let kind: CacheKind = raw.parse()?;
    if !state.manager.is_enabled() {
        return Err(CacheError::Disabled);
    }
    if state.manager.config().await.category(kind).is_none() {
        return Err(CacheError::UnknownCategory(raw.to_string()));
    }
    Ok(kind)
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for GET /cache/:category/:key
///
/// Persistent categories fall back to the durable store.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((category, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let kind = resolve_category(&state, &category).await?;
    check_key(&key)?;

    let value = with_category!(kind, C => {
        match state.manager.get::<C>(&key).await {
            Some(value) => Some(serde_json::to_value(&value)?),
            None => None,
        }
    });

    match value {
        Some(value) => Ok(Json(GetResponse {
            category: kind,
            key,
            value,
        })),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for PUT /cache/:category/:key
///
/// The body value must decode as the category's value type.
pub async fn set_handler(
    State(state): State<AppState>,
    Path((category, key)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let kind = resolve_category(&state, &category).await?;
    check_key(&key)?;

    let ttl = req.ttl_ms.map(Duration::from_millis);
    let accepted = with_category!(kind, C => {
        let value = serde_json::from_value(req.value)?;
        state.manager.set::<C>(&key, value, ttl).await
    });

    if !accepted {
        return Err(CacheError::Rejected(format!(
            "entry '{}' exceeds the {} size ceiling",
            key, kind
        )));
    }
    Ok(Json(SetResponse::new(kind, key)))
}

/// Handler for DELETE /cache/:category/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((category, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    let kind = resolve_category(&state, &category).await?;
    check_key(&key)?;

    let removed = with_category!(kind, C => state.manager.delete::<C>(&key).await);
    if !removed {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(DeleteResponse::new(kind, key)))
}

/// Handler for DELETE /cache/:category
pub async fn clear_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<RemovedResponse>> {
    let kind = resolve_category(&state, &category).await?;
    let removed = state.manager.clear_type(kind).await;

    Ok(Json(RemovedResponse {
        category: Some(kind),
        removed,
    }))
}

/// Handler for DELETE /cache
pub async fn clear_all_handler(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed = state.manager.clear_all().await;
    Json(RemovedResponse {
        category: None,
        removed,
    })
}

/// Handler for POST /cache/:category/invalidate
///
/// Drops every entry whose key starts with `prefix`, or the whole category
/// when no prefix is given.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<RemovedResponse>> {
    let kind = resolve_category(&state, &category).await?;

    let removed = with_category!(kind, C => match req.prefix.as_deref() {
        Some(prefix) => {
            let predicate: InvalidatePredicate<'_, <C as crate::manager::Category>::Value> =
                &|key: &str, _| key.starts_with(prefix);
            state.manager.invalidate::<C>(Some(predicate)).await
        }
        None => state.manager.invalidate::<C>(None).await,
    });

    Ok(Json(RemovedResponse {
        category: Some(kind),
        removed,
    }))
}

/// Handler for GET /cache/:category/export
///
/// Returns the memory-tier snapshot of the category, least recent first.
pub async fn export_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let kind = resolve_category(&state, &category).await?;

    let snapshot = with_category!(kind, C => {
        match state.manager.export_data::<C>().await {
            Some(snapshot) => serde_json::to_value(&snapshot)?,
            None => return Err(CacheError::Disabled),
        }
    });
    Ok(Json(snapshot))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<ManagerStats> {
    Json(state.manager.get_stats().await)
}

/// Handler for POST /stats/reset
pub async fn reset_stats_handler(State(state): State<AppState>) -> StatusCode {
    state.manager.reset_stats().await;
    StatusCode::NO_CONTENT
}

/// Handler for GET /config
pub async fn get_config_handler(State(state): State<AppState>) -> Json<CacheConfig> {
    Json(state.manager.config().await)
}

/// Handler for PUT /config
///
/// Applies the whole configuration; omitted categories become unavailable.
pub async fn put_config_handler(
    State(state): State<AppState>,
    Json(config): Json<CacheConfig>,
) -> Json<CacheConfig> {
    state.manager.update_config(config).await;
    Json(state.manager.config().await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.manager.is_enabled()))
}
