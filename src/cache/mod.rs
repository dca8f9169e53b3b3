//! Kernel cache implementation
//!
//! Provides an LRU cache for kernel evaluations between query and reference
//! points. The cached value defaults to the kernel value alone; searches that
//! also need the pair's distance or inner product cache both together.
//! Dual-tree traversal revisits the same pair of node representatives many
//! times while it descends self-children, so memoizing those evaluations
//! avoids redundant kernel computations. When queries and references are the
//! same set the kernel is symmetric and only K(i, j) with i <= j is stored.

use lru::LruCache;
use std::mem;
use std::num::NonZeroUsize;

/// Cache key for kernel values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    query: usize,
    reference: usize,
}

impl CacheKey {
    /// Create a key, normalized so that query <= reference for symmetric caches
    fn new(query: usize, reference: usize, symmetric: bool) -> Self {
        if symmetric && query > reference {
            Self {
                query: reference,
                reference: query,
            }
        } else {
            Self { query, reference }
        }
    }
}

/// LRU cache for kernel values
pub struct KernelCache<V = f64> {
    cache: LruCache<CacheKey, V>,
    symmetric: bool,
    hits: u64,
    misses: u64,
}

impl<V: Copy> KernelCache<V> {
    /// Bytes held by one entry
    pub const ENTRY_BYTES: usize = mem::size_of::<CacheKey>() + mem::size_of::<V>();

    /// Create a new kernel cache with specified capacity in number of entries
    ///
    /// `symmetric` should be set when queries and references index the same set.
    pub fn new(capacity: usize, symmetric: bool) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            symmetric,
            hits: 0,
            misses: 0,
        }
    }

    /// Create a kernel cache with capacity based on memory size in bytes
    pub fn with_memory_limit(memory_bytes: usize, symmetric: bool) -> Self {
        let capacity = (memory_bytes / Self::ENTRY_BYTES).max(1);
        Self::new(capacity, symmetric)
    }

    /// Get a kernel value from cache
    pub fn get(&mut self, query: usize, reference: usize) -> Option<V> {
        let key = CacheKey::new(query, reference, self.symmetric);
        if let Some(&value) = self.cache.get(&key) {
            self.hits += 1;
            Some(value)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Put a kernel value into cache
    pub fn put(&mut self, query: usize, reference: usize, value: V) {
        let key = CacheKey::new(query, reference, self.symmetric);
        self.cache.put(key, value);
    }

    /// Return the cached value or compute, store and return it
    pub fn get_or_compute<F: FnOnce() -> V>(
        &mut self,
        query: usize,
        reference: usize,
        compute: F,
    ) -> V {
        if let Some(value) = self.get(query, reference) {
            return value;
        }
        let value = compute();
        self.put(query, reference, value);
        value
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
