//! Cache notifications
//!
//! Synchronous publish-subscribe from the manager to external observers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::CacheKind;

// == Cache Event ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    CacheHit { category: CacheKind, key: String },
    CacheMiss { category: CacheKind, key: String },
    CacheCleared { category: CacheKind },
}

impl CacheEvent {
    pub fn category(&self) -> CacheKind {
        match self {
            CacheEvent::CacheHit { category, .. }
            | CacheEvent::CacheMiss { category, .. }
            | CacheEvent::CacheCleared { category } => *category,
        }
    }
}

// == Observer ==
/// Receives every event the manager emits.
///
/// Called inline on the emitting task; a panicking observer is isolated and
/// logged.
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

impl<F> CacheObserver for F
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    fn on_event(&self, event: &CacheEvent) {
        self(event)
    }
}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_event(&self, event: &CacheEvent) {
        debug!(?event, "cache event");
    }
}

/// Registered observers, fixed at construction.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn CacheObserver>>,
}

impl Observers {
    pub(crate) fn push(&mut self, observer: Arc<dyn CacheObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        for observer in &self.observers {
            if catch_unwind(AssertUnwindSafe(|| observer.on_event(&event))).is_err() {
                warn!(category = %event.category(), "Cache observer panicked; event dropped for it");
            }
        }
    }
}
