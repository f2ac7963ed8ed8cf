use async_trait::async_trait;
use thiserror::Error;

use crate::domain::paths::SitePath;

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("page cache unavailable: {0}")]
    Unavailable(String),
}

/// Marks rendered output for a path stale.
///
/// Implementations must be idempotent and safe to call concurrently for the
/// same or different paths. The call completes before the caller responds.
#[async_trait]
pub trait PageCacheInvalidator: Send + Sync {
    async fn invalidate(&self, path: &SitePath) -> Result<(), InvalidationError>;
}
