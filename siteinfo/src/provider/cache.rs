//! In-memory page cache with a TTL.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::fetcher::FetchedPage;

struct CacheEntry {
    page: Arc<FetchedPage>,
    stored_at: Instant,
}

/// Default number of pages a cache holds.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Memoises fetched pages by URL so repeated lookups do not refetch.
///
/// Expired entries are dropped when read and swept on every insert. When
/// the cache is full, the oldest entry makes room for the new one.
pub struct PageCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
}

impl PageCache {
    /// Creates a cache holding up to [`DEFAULT_CACHE_CAPACITY`] pages.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache holding up to `capacity` pages, at least one.
    #[must_use]
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Gets a cached page.
    pub fn get(&self, url: &str) -> Option<Arc<FetchedPage>> {
        if let Some(entry) = self.entries.get(url) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.page.clone());
            }
            drop(entry);
            self.entries.remove(url);
        }
        None
    }

    /// Stores a page under the URL it was requested with.
    pub fn insert(&self, url: impl Into<String>, page: Arc<FetchedPage>) {
        let url = url.into();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);

        while self.entries.len() >= self.capacity && !self.entries.contains_key(&url) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.stored_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }

        self.entries.insert(
            url,
            CacheEntry {
                page,
                stored_at: Instant::now(),
            },
        );
    }

    /// Most pages the cache holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish()
    }
}
