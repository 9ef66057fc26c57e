//! Size Calculators
//!
//! Pluggable byte estimators used by the engine's byte budget.

use std::sync::Arc;

use serde::Serialize;

/// Estimates the byte footprint of a key/value pair.
///
/// Calculators must be monotonic in the payload and free of side effects.
pub type SizeCalculator<K, V> = Arc<dyn Fn(&K, &V) -> usize + Send + Sync>;

// == Size Estimate ==
/// Rough in-memory footprint of a cached value.
pub trait SizeEstimate {
    fn estimated_size(&self) -> usize;
}

impl SizeEstimate for String {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl SizeEstimate for Vec<u8> {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl SizeEstimate for serde_json::Value {
    fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

impl<T: SizeEstimate> SizeEstimate for Option<T> {
    fn estimated_size(&self) -> usize {
        self.as_ref().map_or(0, SizeEstimate::estimated_size)
    }
}

// == Calculators ==
/// Every entry weighs one unit, turning the byte budget into a second item budget.
pub fn unit<K: 'static, V: 'static>() -> SizeCalculator<K, V> {
    Arc::new(|_: &K, _: &V| 1usize)
}

/// Value length in bytes, key excluded.
pub fn string_len<K: 'static>() -> SizeCalculator<K, String> {
    Arc::new(|_: &K, value: &String| value.len())
}

/// Key length plus the value's own estimate.
pub fn estimated<K, V>() -> SizeCalculator<K, V>
where
    K: AsRef<str> + 'static,
    V: SizeEstimate + 'static,
{
    Arc::new(|key: &K, value: &V| key.as_ref().len() + value.estimated_size())
}

/// Length of the value's JSON encoding; unserialisable values weigh zero.
pub fn json<K, V>() -> SizeCalculator<K, V>
where
    K: 'static,
    V: Serialize + 'static,
{
    Arc::new(|_: &K, value: &V| serde_json::to_vec(value).map(|b| b.len()).unwrap_or(0))
}
