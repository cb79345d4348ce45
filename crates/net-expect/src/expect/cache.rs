//! Regex cache for criteria and assertion patterns.
//!
//! Pages tend to register the same URL patterns over and over (one per
//! navigation or click), so compiled regexes are shared through a bounded
//! cache keyed by the pattern source.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;

use super::pattern::CompiledRegex;
use crate::error::{NetExpectError, Result};

/// Default maximum cache size.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// A bounded cache of compiled regular expressions.
///
/// When full, the oldest inserted pattern is evicted first.
pub struct RegexCache {
    inner: RwLock<Entries>,
    max_size: usize,
    total_hits: AtomicUsize,
    total_misses: AtomicUsize,
}

#[derive(Default)]
struct Entries {
    by_pattern: HashMap<String, Arc<Regex>>,
    order: VecDeque<String>,
}

impl RegexCache {
    /// Create a cache holding at most `max_size` patterns.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: RwLock::new(Entries::default()),
            max_size: max_size.max(1),
            total_hits: AtomicUsize::new(0),
            total_misses: AtomicUsize::new(0),
        }
    }

    /// Get a cached regex or compile and cache it.
    ///
    /// `field` names the criterion or clause the pattern came from and is
    /// carried into the [`NetExpectError::InvalidPattern`] on failure.
    pub fn compile(&self, field: &str, pattern: &str) -> Result<CompiledRegex> {
        {
            let entries = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = entries.by_pattern.get(pattern) {
                self.total_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(CompiledRegex::new(pattern, Arc::clone(regex)));
            }
        }

        self.total_misses.fetch_add(1, Ordering::Relaxed);
        let regex = Regex::new(pattern)
            .map_err(|e| NetExpectError::invalid_pattern(field, pattern, e.to_string()))?;
        let regex = Arc::new(regex);

        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have inserted while we compiled.
        if let Some(existing) = entries.by_pattern.get(pattern) {
            return Ok(CompiledRegex::new(pattern, Arc::clone(existing)));
        }
        if entries.by_pattern.len() >= self.max_size
            && let Some(oldest) = entries.order.pop_front()
        {
            entries.by_pattern.remove(&oldest);
        }
        entries
            .by_pattern
            .insert(pattern.to_string(), Arc::clone(&regex));
        entries.order.push_back(pattern.to_string());

        Ok(CompiledRegex::new(pattern, regex))
    }

    /// Check if a pattern is cached.
    #[must_use]
    pub fn contains(&self, pattern: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_pattern
            .contains_key(pattern)
    }

    /// Number of cached patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_pattern
            .len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            total_hits: self.total_hits.load(Ordering::Relaxed),
            total_misses: self.total_misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl std::fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics about a regex cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached patterns.
    pub size: usize,
    /// Maximum cache size.
    pub max_size: usize,
    /// Total cache hits.
    pub total_hits: usize,
    /// Total cache misses.
    pub total_misses: usize,
}

impl CacheStats {
    /// Hit rate between 0.0 and 1.0; 1.0 when nothing was looked up yet.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits + self.total_misses;
        if total == 0 {
            1.0
        } else {
            self.total_hits as f64 / total as f64
        }
    }
}
