//! Cloud Cache - tiered, category-aware caching for a cloud-storage client
//!
//! A generic LRU engine with TTL and byte budgets, and a manager that runs
//! one engine per data category (metadata, thumbnails, content, listings,
//! search results) with an optional durable second tier.

pub mod api;
pub mod cache;
pub mod config;
pub mod durable;
pub mod error;
pub mod manager;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::{CacheConfig, CategoryConfig, Config};
pub use error::{CacheError, Result};
pub use manager::{CacheEvent, CacheKind, CacheManager, CacheObserver};
pub use tasks::spawn_sweep_task;
