//! Content-addressed memoization for repeated sanitization.
//!
//! The pipeline is re-invoked on every recomposition of a scrolling chat
//! list, almost always with input it has already seen. A small LRU keyed by
//! a cheap content hash short-circuits those calls. The hash is not a
//! security boundary: a collision merely returns a stale sanitized string
//! for a different input, which is acceptable for a performance cache.

use lru::LruCache;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Default number of memoized outputs retained.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Bounded LRU memo of sanitized outputs keyed by input content hash.
///
/// Constructor-injected rather than process-global so tests get a fresh,
/// deterministic cache. A single coarse lock guards lookup and insert;
/// computation runs outside the lock, so concurrent callers with the same
/// input may compute redundantly but never corrupt the map.
pub struct SanitizationCache {
    entries: Mutex<LruCache<u64, String>>,
}

impl SanitizationCache {
    /// Creates a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache holding at most `capacity` entries (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the memoized output for `text`, computing and storing it on a
    /// miss. A hit refreshes the entry's recency.
    pub fn get_or_compute(&self, text: &str, compute: impl FnOnce(&str) -> String) -> String {
        let key = content_hash(text);

        {
            let mut entries = self.lock();
            if let Some(hit) = entries.get(&key) {
                trace!(key, "sanitization cache hit");
                return hit.clone();
            }
        }

        trace!(key, "sanitization cache miss");
        let value = compute(text);
        self.lock().put(key, value.clone());
        value
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<u64, String>> {
        // Entries are plain strings; a panic mid-insert cannot leave them
        // inconsistent, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SanitizationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SanitizationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanitizationCache")
            .field("len", &self.len())
            .finish()
    }
}

/// Cheap non-cryptographic content hash over the full input string.
fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_second_call_skips_compute() {
        let cache = SanitizationCache::new();
        let calls = AtomicUsize::new(0);
        let compute = |t: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            t.to_uppercase()
        };

        let first = cache.get_or_compute("hello", compute);
        let second = cache.get_or_compute("hello", compute);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_inputs_compute_separately() {
        let cache = SanitizationCache::new();
        let a = cache.get_or_compute("a", |t| t.to_string());
        let b = cache.get_or_compute("b", |t| t.to_string());
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = SanitizationCache::with_capacity(2);
        let calls = AtomicUsize::new(0);
        let compute = |t: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            t.to_string()
        };

        cache.get_or_compute("one", compute);
        cache.get_or_compute("two", compute);
        // Touch "one" so "two" is the eviction candidate.
        cache.get_or_compute("one", compute);
        cache.get_or_compute("three", compute);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // "two" was evicted and must recompute; "one" must not.
        cache.get_or_compute("one", compute);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        cache.get_or_compute("two", compute);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_clear() {
        let cache = SanitizationCache::new();
        cache.get_or_compute("x", |t| t.to_string());
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache = SanitizationCache::with_capacity(0);
        cache.get_or_compute("x", |t| t.to_string());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;

        let cache = Arc::new(SanitizationCache::new());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let input = format!("input-{}", (n + i) % 10);
                        let out = cache.get_or_compute(&input, |t| t.to_uppercase());
                        assert_eq!(out, input.to_uppercase());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread panicked");
        }
    }
}
