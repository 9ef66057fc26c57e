//! Configuration Module
//!
//! Cache budgets per category, loaded from defaults, an optional JSON file and
//! environment variables.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheLimits;
use crate::error::Result;
use crate::manager::CacheKind;

// == Category Config ==
/// Budgets and persistence policy of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Maximum number of live entries
    pub max_items: usize,
    /// Default TTL in milliseconds, 0 = entries never expire by default
    pub max_age_ms: u64,
    /// Aggregate byte budget
    pub max_size_bytes: Option<usize>,
    /// Ceiling for a single entry
    pub max_entry_bytes: Option<usize>,
    /// Back this category with the durable store
    pub persistent: bool,
    /// Extend an entry's TTL every time it is read
    pub refresh_ttl_on_read: bool,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            max_items: 100,
            max_age_ms: 5 * 60 * 1000,
            max_size_bytes: None,
            max_entry_bytes: None,
            persistent: false,
            refresh_ttl_on_read: false,
        }
    }
}

impl CategoryConfig {
    fn new(max_items: usize, max_age: Duration) -> Self {
        Self {
            max_items,
            max_age_ms: u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    fn bytes(mut self, max_size_bytes: usize) -> Self {
        self.max_size_bytes = Some(max_size_bytes);
        self
    }

    fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Default TTL, `None` when `max_age_ms` is zero.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.max_age_ms > 0).then(|| Duration::from_millis(self.max_age_ms))
    }

    /// Engine limits derived from this configuration.
    pub fn limits(&self) -> CacheLimits {
        CacheLimits {
            max_items: Some(self.max_items),
            max_bytes: self.max_size_bytes,
            max_entry_bytes: self.max_entry_bytes,
            default_ttl: self.default_ttl(),
            refresh_ttl_on_read: self.refresh_ttl_on_read,
        }
    }
}

// == Cache Config ==
/// Configuration consumed by `CacheManager` at construction and by
/// `update_config`. Only categories listed here receive an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub categories: BTreeMap<CacheKind, CategoryConfig>,
    /// Directory used by the file-backed durable store
    pub storage_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        const MB: usize = 1024 * 1024;
        let categories = BTreeMap::from([
            (
                CacheKind::Metadata,
                CategoryConfig::new(1000, Duration::from_secs(5 * 60)).persistent(),
            ),
            (
                CacheKind::Thumbnail,
                CategoryConfig::new(500, Duration::from_secs(60 * 60))
                    .bytes(50 * MB)
                    .persistent(),
            ),
            (
                CacheKind::Content,
                CategoryConfig::new(50, Duration::from_secs(10 * 60)).bytes(100 * MB),
            ),
            (
                CacheKind::Listing,
                CategoryConfig::new(200, Duration::from_secs(2 * 60)),
            ),
            (
                CacheKind::Search,
                CategoryConfig::new(100, Duration::from_secs(60)),
            ),
        ]);

        Self {
            enabled: true,
            categories,
            storage_path: None,
        }
    }
}

impl CacheConfig {
    pub fn category(&self, kind: CacheKind) -> Option<&CategoryConfig> {
        self.categories.get(&kind)
    }

    /// Reads a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

// == Process Config ==
/// Everything the binary needs at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    /// Inspection HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds, 0 disables the task
    pub sweep_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            sweep_interval: 30,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CONFIG_FILE` - JSON file with a full `CacheConfig`
    /// - `CACHE_ENABLED` - `true`/`false` override
    /// - `CACHE_STORAGE_PATH` - directory for the durable store
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - expiry sweep frequency in seconds (default: 30)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let mut cache = match var("CACHE_CONFIG_FILE") {
            Some(path) => CacheConfig::from_json_file(path)?,
            None => defaults.cache,
        };
        if let Some(enabled) = var("CACHE_ENABLED").and_then(|v| v.parse().ok()) {
            cache.enabled = enabled;
        }
        if let Some(path) = var("CACHE_STORAGE_PATH") {
            cache.storage_path = Some(PathBuf::from(path));
        }

        Ok(Self {
            cache,
            server_port: var("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            sweep_interval: var("SWEEP_INTERVAL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
        })
    }
}
