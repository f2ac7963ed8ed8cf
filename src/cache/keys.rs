//! Cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::domain::paths::SitePath;

/// Key of one cached rendering: a path plus the query string it was served for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: SitePath,
    pub query_hash: u64,
}

impl PageKey {
    pub fn new(path: SitePath, query: &str) -> Self {
        Self {
            path,
            query_hash: hash_query(query),
        }
    }
}

/// Hash a query string for cache key generation.
pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}
