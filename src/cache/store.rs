//! In-process storage for rendered pages.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::{debug, warn};

use crate::domain::paths::SitePath;

use super::config::CacheConfig;
use super::invalidator::{InvalidationError, PageCacheInvalidator};
use super::keys::PageKey;

const SOURCE: &str = "cache::store";

/// A rendered response ready to be replayed.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Per-path invalidation counter.
///
/// A fill records the generation of its path before rendering and is only
/// stored if no invalidation happened in between.
pub type Generation = u64;

struct Pages {
    entries: LruCache<PageKey, CachedPage>,
    generations: HashMap<SitePath, Generation>,
}

impl Pages {
    fn generation(&self, path: &SitePath) -> Generation {
        self.generations.get(path).copied().unwrap_or_default()
    }

    fn insert(&mut self, key: PageKey, page: CachedPage) -> Option<PageKey> {
        let evicted = self
            .entries
            .push(key.clone(), page)
            .map(|(evicted, _)| evicted)
            .filter(|evicted| *evicted != key);
        if evicted.is_some() {
            counter!("clubhouse_page_cache_evict_total").increment(1);
        }
        evicted
    }
}

/// LRU store of rendered pages.
///
/// Invalidation removes every rendering of a path regardless of the query
/// string it was served for.
pub struct PageStore {
    pages: RwLock<Pages>,
}

impl PageStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            pages: RwLock::new(Pages {
                entries: LruCache::new(config.response_limit),
                generations: HashMap::new(),
            }),
        }
    }

    pub fn get(&self, key: &PageKey) -> Option<CachedPage> {
        let hit = self.write("get").entries.get(key).cloned();
        match hit {
            Some(page) => {
                counter!("clubhouse_page_cache_hit_total").increment(1);
                Some(page)
            }
            None => {
                counter!("clubhouse_page_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Store a rendering, returning the key evicted to make room, if any.
    pub fn put(&self, key: PageKey, page: CachedPage) -> Option<PageKey> {
        self.write("put").insert(key, page)
    }

    /// Current generation of `path`. Read it before rendering and hand it to
    /// [`PageStore::fill`].
    pub fn generation(&self, path: &SitePath) -> Generation {
        self.read("generation").generation(path)
    }

    /// Store a rendering made while `path` was at generation `seen`.
    ///
    /// Returns `false` and drops the page when the path was invalidated
    /// after `seen` was read.
    pub fn fill(&self, key: PageKey, page: CachedPage, seen: Generation) -> bool {
        let mut pages = self.write("fill");
        if pages.generation(&key.path) != seen {
            drop(pages);
            debug!(path = %key.path, "discarding page rendered before invalidation");
            return false;
        }
        pages.insert(key, page);
        true
    }

    /// Drop every rendering of `path`. Returns how many entries were removed.
    pub fn invalidate_path(&self, path: &SitePath) -> usize {
        let mut pages = self.write("invalidate_path");
        *pages.generations.entry(path.clone()).or_default() += 1;
        let stale: Vec<PageKey> = pages
            .entries
            .iter()
            .filter(|(key, _)| &key.path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            pages.entries.pop(key);
        }
        drop(pages);

        counter!("clubhouse_page_cache_invalidated_total").increment(stale.len() as u64);
        debug!(path = %path, removed = stale.len(), "page cache path invalidated");
        stale.len()
    }

    /// Presence check that neither bumps recency nor records a hit or miss.
    pub fn contains(&self, key: &PageKey) -> bool {
        self.read("contains").entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.read("len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, Pages> {
        self.pages.read().unwrap_or_else(|poisoned| {
            warn!(
                op,
                target_module = SOURCE,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned page cache lock"
            );
            poisoned.into_inner()
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, Pages> {
        self.pages.write().unwrap_or_else(|poisoned| {
            warn!(
                op,
                target_module = SOURCE,
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                "Recovered from poisoned page cache lock"
            );
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl PageCacheInvalidator for PageStore {
    async fn invalidate(&self, path: &SitePath) -> Result<(), InvalidationError> {
        self.invalidate_path(path);
        Ok(())
    }
}
