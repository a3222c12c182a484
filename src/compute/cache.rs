//! Content-addressed memoization of fitness evaluations.
//!
//! Structurally identical individuals, and individuals that reappear across
//! generations, produce bit-identical embeddings. The cache stores the
//! expensive similarity result under a [`ContentKey`] so those repeats cost a
//! hash lookup instead of a full neighbour sweep.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::schema::CacheConfig;

use super::key::ContentKey;
use super::similarity::SimilarityScore;

/// Accesses between periodic cache reports.
const REPORT_INTERVAL: u64 = 1000;

/// Which memoization slot an evaluation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSlot {
    /// Read and write slot `n`.
    Use(usize),
    /// Skip the cache entirely; nothing is read, stored or counted.
    Bypass,
}

impl Default for CacheSlot {
    fn default() -> Self {
        Self::Use(0)
    }
}

/// Cache errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache slot {slot} out of range ({slots} slots)")]
    SlotOutOfRange { slot: usize, slots: usize },
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CacheStats {
    /// Cached lookups performed.
    pub accesses: u64,
    /// Results stored after a miss.
    pub stores: u64,
    /// Entries currently held across all slots.
    pub entries: usize,
}

impl CacheStats {
    /// Lookups answered without storing a new entry.
    #[inline]
    pub fn hits(&self) -> u64 {
        self.accesses.saturating_sub(self.stores)
    }

    /// Hit rate in percent.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits() as f64 * 100.0 / self.accesses as f64
        }
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache size: {}, Accesses: {} ({:.2}% hit rate)",
            self.stores,
            self.accesses,
            self.hit_rate()
        )
    }
}

/// Set of independent memoization slots keyed by embedding content.
///
/// Each slot is its own map behind its own lock, so unrelated metrics can be
/// cached side by side. The compute closure runs outside the lock: two
/// threads racing on the same key may both compute, the first insert wins.
/// Entries are never evicted or updated.
pub struct EvaluationCache<V = SimilarityScore> {
    slots: Vec<Mutex<HashMap<ContentKey, V>>>,
    enabled: bool,
    accesses: AtomicU64,
    stores: AtomicU64,
    warned: AtomicBool,
}

impl<V: Clone> EvaluationCache<V> {
    /// Create an enabled cache with `slots` independent slots.
    pub fn new(slots: usize) -> Self {
        Self::with_enabled(slots, true)
    }

    /// Create a cache that always recomputes.
    pub fn disabled(slots: usize) -> Self {
        Self::with_enabled(slots, false)
    }

    /// Create a cache from run configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_enabled(config.slots, config.enabled)
    }

    fn with_enabled(slots: usize, enabled: bool) -> Self {
        Self {
            slots: (0..slots).map(|_| Mutex::new(HashMap::new())).collect(),
            enabled,
            accesses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            warned: AtomicBool::new(false),
        }
    }

    /// Whether results are being memoized.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Return the stored result for `key` in `slot`, or compute and store it.
    pub fn lookup_or_compute<F>(
        &self,
        key: ContentKey,
        slot: CacheSlot,
        compute: F,
    ) -> Result<V, CacheError>
    where
        F: FnOnce() -> V,
    {
        let index = match slot {
            CacheSlot::Bypass => return Ok(compute()),
            CacheSlot::Use(index) => index,
        };
        let map = self.slots.get(index).ok_or(CacheError::SlotOutOfRange {
            slot: index,
            slots: self.slots.len(),
        })?;

        if !self.enabled {
            if !self.warned.swap(true, Ordering::Relaxed) {
                log::warn!("Evaluation cache disabled, computing every evaluation");
            }
            return Ok(compute());
        }

        let accesses = self.accesses.fetch_add(1, Ordering::Relaxed) + 1;
        if accesses % REPORT_INTERVAL == 0 {
            log::debug!("{}", self.stats());
        }

        if let Some(hit) = map.lock().get(&key) {
            return Ok(hit.clone());
        }

        let value = compute();
        match map.lock().entry(key) {
            Entry::Occupied(_) => {
                // Lost a race to another thread; both results are identical.
            }
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
                self.stores.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(value)
    }

    /// Look up without computing. Does not touch the counters.
    pub fn get(&self, key: &ContentKey, slot: usize) -> Option<V> {
        self.slots.get(slot)?.lock().get(key).cloned()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            accesses: self.accesses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            entries: self.slots.iter().map(|s| s.lock().len()).sum(),
        }
    }
}
