//! Cache configuration.

use std::num::NonZeroUsize;

const DEFAULT_RESPONSE_LIMIT: NonZeroUsize = NonZeroUsize::new(256).unwrap();
const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve and store public pages through the cache.
    pub enabled: bool,
    /// Maximum number of cached renderings.
    pub response_limit: NonZeroUsize,
    /// Responses with larger bodies, or with no known length, are passed
    /// through uncached.
    pub body_limit_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            response_limit: DEFAULT_RESPONSE_LIMIT,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            response_limit: settings.response_limit,
            body_limit_bytes: settings.body_limit_bytes.get(),
        }
    }
}
