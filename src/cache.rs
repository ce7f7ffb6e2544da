//! Optional memoization for repeated loads and analyses.
//!
//! Nothing in the core engines consults this module. Callers that see the
//! same upload over and over (an interactive dashboard, say) wrap their calls
//! in a `MemoCache` keyed by the input bytes plus the parameters that shaped
//! the result.

use log::{debug, trace};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::error::{Error, LoadFailure, Result};
use crate::ingest::loader::{FormatHint, Loaded, Loader};

/// Default number of entries kept by a `MemoCache`
pub const DEFAULT_CAPACITY: usize = 32;

/// SHA-256 over input bytes and JSON-encoded parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Key for `bytes` computed under `params`
    pub fn new<P: Serialize + ?Sized>(bytes: &[u8], params: &P) -> Result<Self> {
        let encoded = serde_json::to_vec(params)?;
        let mut hasher = Sha256::new();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
        hasher.update(&encoded);
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Ok(Self(digest))
    }

    /// Lowercase hex digest
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate in 0.0..=1.0; 0.0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups > 0 {
            self.hits as f64 / lookups as f64
        } else {
            0.0
        }
    }
}

struct Entries<V> {
    values: HashMap<CacheKey, V>,
    /// Insertion order, oldest first
    order: VecDeque<CacheKey>,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Bounded map from `CacheKey` to a cloned value, evicting the oldest entry
/// when full
pub struct MemoCache<V> {
    entries: RwLock<Entries<V>>,
    counters: RwLock<Counters>,
    capacity: usize,
}

// A panic while holding a lock leaves the map consistent, so poisoned locks
// are recovered rather than propagated.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<V: Clone> MemoCache<V> {
    /// Create a cache holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries {
                values: HashMap::new(),
                order: VecDeque::new(),
            }),
            counters: RwLock::new(Counters::default()),
            capacity: capacity.max(1),
        }
    }

    /// Look up a value
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let found = read(&self.entries).values.get(key).cloned();
        let mut counters = write(&self.counters);
        if found.is_some() {
            counters.hits += 1;
            trace!("cache hit {}", key);
        } else {
            counters.misses += 1;
            trace!("cache miss {}", key);
        }
        found
    }

    /// Store a value, evicting the oldest entries beyond capacity
    pub fn insert(&self, key: CacheKey, value: V) {
        let mut entries = write(&self.entries);
        if entries.values.insert(key, value).is_none() {
            entries.order.push_back(key);
        }

        let mut evicted = 0;
        while entries.values.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.values.remove(&oldest);
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            debug!("cache evicted {} entr(ies)", evicted);
            write(&self.counters).evictions += evicted;
        }
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Errors from `compute` are passed through and never cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: CacheKey, compute: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        read(&self.entries).values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        read(&self.entries).values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry; statistics are kept
    pub fn clear(&self) {
        let mut entries = write(&self.entries);
        entries.values.clear();
        entries.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let counters = read(&self.counters);
        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}

impl<V: Clone> Default for MemoCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// `Loader` with memoized successful loads
pub struct CachedLoader {
    loader: Loader,
    cache: MemoCache<Loaded>,
}

impl CachedLoader {
    pub fn new(loader: Loader, capacity: usize) -> Self {
        Self {
            loader,
            cache: MemoCache::new(capacity),
        }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Load through the cache; failures are recomputed on every call
    pub fn load(
        &self,
        bytes: &[u8],
        hint: FormatHint,
    ) -> std::result::Result<Loaded, CachedLoadError> {
        let key = CacheKey::new(bytes, &(hint, self.loader.config()))
            .map_err(CachedLoadError::Key)?;
        self.cache
            .get_or_try_insert_with(key, || self.loader.load(bytes, hint))
            .map_err(CachedLoadError::Load)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&self) {
        self.cache.clear()
    }
}

/// Failure of a cached load
#[derive(Debug, thiserror::Error)]
pub enum CachedLoadError {
    #[error("failed to build cache key: {0}")]
    Key(Error),
    #[error(transparent)]
    Load(LoadFailure),
}
