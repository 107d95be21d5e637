//! Deduplicated evaluation of expensive per-row computations.
//!
//! Candidate tables routinely contain 1e4-1e6 rows whose driving inputs
//! collapse to a few thousand distinct values after rounding. Instead of
//! diagonalizing once per row, the pipeline rounds the inputs, reduces
//! them to a sorted unique set, evaluates once per unique value through a
//! bounded LRU memo cache, and broadcasts results back to all rows by
//! binary search. The broadcast is observably identical to the naive
//! per-row computation on the rounded inputs.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use tracing::debug;

/// Round to a fixed number of decimal digits. This is the binning step
/// that makes near-identical simulated capacitances share one
/// diagonalization.
#[inline]
pub fn round_to_digits(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Sorted unique values under total ordering (NaN-safe).
pub fn unique_sorted(values: &[f64]) -> Vec<f64> {
    let mut unique = values.to_vec();
    unique.sort_by(|a, b| a.total_cmp(b));
    unique.dedup_by(|a, b| a.total_cmp(b) == std::cmp::Ordering::Equal);
    unique
}

/// Evaluate `per_unique` once per distinct rounded input and broadcast
/// the results back to every row, preserving row order.
pub fn broadcast_unique<T, F>(inputs: &[f64], digits: i32, mut per_unique: F) -> Vec<T>
where
    T: Copy,
    F: FnMut(f64) -> T,
{
    let rounded: Vec<f64> = inputs.iter().map(|&v| round_to_digits(v, digits)).collect();
    let unique = unique_sorted(&rounded);
    debug!(
        rows = inputs.len(),
        unique = unique.len(),
        "deduplicated inputs for bulk evaluation"
    );
    let outputs: Vec<T> = unique.iter().map(|&u| per_unique(u)).collect();
    rounded
        .iter()
        .map(|v| {
            let idx = unique
                .binary_search_by(|u| u.total_cmp(v))
                .expect("rounded input is present in its own unique set");
            outputs[idx]
        })
        .collect()
}

type CacheKey = (OrderedFloat<f64>, OrderedFloat<f64>);

struct CacheEntry {
    value: (f64, f64),
    last_used: u64,
}

/// Bounded LRU cache for diagonalization results, keyed on rounded
/// `(EJ, EC)` pairs.
///
/// The cache is an explicit object owned by its model, never ambient
/// process state, so tests and independent queries cannot contaminate
/// each other through it. Capacity and eviction are configuration.
pub struct MemoCache {
    capacity: usize,
    tick: u64,
    hits: u64,
    misses: u64,
    entries: AHashMap<CacheKey, CacheEntry>,
}

impl MemoCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            hits: 0,
            misses: 0,
            entries: AHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up `(ej, ec)`, computing and storing on a miss. Evicts the
    /// least-recently-used entry when full.
    pub fn get_or_insert_with<F>(&mut self, ej: f64, ec: f64, compute: F) -> (f64, f64)
    where
        F: FnOnce() -> (f64, f64),
    {
        self.tick += 1;
        let key = (OrderedFloat(ej), OrderedFloat(ec));
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = self.tick;
            self.hits += 1;
            return entry.value;
        }
        self.misses += 1;
        let value = compute();
        if self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_used: self.tick,
            },
        );
        value
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| *k)
        {
            self.entries.remove(&key);
        }
    }
}

impl std::fmt::Debug for MemoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_digits() {
        assert_eq!(round_to_digits(0.1234567, 3), 0.123);
        assert_eq!(round_to_digits(0.1235567, 3), 0.124);
    }

    #[test]
    fn test_broadcast_matches_naive() {
        let inputs = [0.21, 0.29999999, 0.3, 0.21, 0.25, 0.3000001];
        let digits = 6;
        let mut calls = 0usize;
        let deduped = broadcast_unique(&inputs, digits, |v| {
            calls += 1;
            v * 2.0
        });
        let naive: Vec<f64> = inputs
            .iter()
            .map(|&v| round_to_digits(v, digits) * 2.0)
            .collect();
        assert_eq!(deduped, naive);
        // 0.29999999 and 0.3000001 both round onto 0.3; 0.21 repeats.
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_cache_hit_and_miss_accounting() {
        let mut cache = MemoCache::new(8);
        let a = cache.get_or_insert_with(20.0, 0.2, || (5.4, -210.0));
        let b = cache.get_or_insert_with(20.0, 0.2, || panic!("must be cached"));
        assert_eq!(a, b);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache = MemoCache::new(2);
        cache.get_or_insert_with(1.0, 1.0, || (1.0, 1.0));
        cache.get_or_insert_with(2.0, 2.0, || (2.0, 2.0));
        // Touch (1,1) so (2,2) is the LRU entry.
        cache.get_or_insert_with(1.0, 1.0, || panic!("must be cached"));
        cache.get_or_insert_with(3.0, 3.0, || (3.0, 3.0));
        assert_eq!(cache.len(), 2);
        // (2,2) was the LRU entry and is gone; (1,1) is still resident.
        cache.get_or_insert_with(1.0, 1.0, || panic!("must still be cached"));
        let mut recomputed = false;
        cache.get_or_insert_with(2.0, 2.0, || {
            recomputed = true;
            (2.0, 2.0)
        });
        assert!(recomputed);
    }
}
