//! Rendered-page cache.
//!
//! Successful public `GET` responses are kept in an in-process LRU store keyed
//! by site path and query string. Revalidation marks paths stale by dropping
//! their entries; the next request for the path regenerates it from the
//! origin renderer.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! response_limit = 256
//! body_limit_bytes = 2097152
//! ```

mod config;
mod invalidator;
mod keys;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use invalidator::{InvalidationError, PageCacheInvalidator};
pub use keys::{PageKey, hash_query};
pub use middleware::{CacheState, page_cache_layer};
pub use store::{CachedPage, PageStore};
