//! Revalidation gateway: authenticates CMS webhooks and marks pages stale.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::cache::{InvalidationError, PageCacheInvalidator};
use crate::config::RevalidationSettings;
use crate::domain::error::DomainError;
use crate::domain::paths::{InvalidationTargets, SitePath};

#[derive(Debug, Error)]
pub enum RevalidationError {
    #[error("invalid revalidation secret")]
    Unauthorized,
    #[error(transparent)]
    InvalidSlug(#[from] DomainError),
    #[error("failed to invalidate `{path}`")]
    Invalidation {
        path: SitePath,
        #[source]
        source: InvalidationError,
    },
}

impl RevalidationError {
    fn outcome(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidSlug(_) => "bad_request",
            Self::Invalidation { .. } => "internal",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RevalidateCommand {
    pub secret: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Revalidated {
    pub targets: InvalidationTargets,
    pub at: OffsetDateTime,
}

#[derive(Clone)]
pub struct RevalidationService {
    settings: Arc<RevalidationSettings>,
    invalidator: Arc<dyn PageCacheInvalidator>,
}

impl RevalidationService {
    pub fn new(
        settings: Arc<RevalidationSettings>,
        invalidator: Arc<dyn PageCacheInvalidator>,
    ) -> Self {
        Self {
            settings,
            invalidator,
        }
    }

    pub async fn revalidate(
        &self,
        cmd: RevalidateCommand,
    ) -> Result<Revalidated, RevalidationError> {
        let result = self.run(cmd).await;
        let outcome = match &result {
            Ok(_) => "revalidated",
            Err(err) => err.outcome(),
        };
        counter!("clubhouse_revalidation_total", "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, cmd: RevalidateCommand) -> Result<Revalidated, RevalidationError> {
        let presented = cmd.secret.as_deref().unwrap_or_default();
        if !self.settings.secret.verify(presented) {
            return Err(RevalidationError::Unauthorized);
        }

        let targets = match cmd.slug.as_deref() {
            Some(slug) => InvalidationTargets::Slug(SitePath::parse(slug)?),
            None => InvalidationTargets::Defaults(self.settings.default_paths.clone()),
        };

        for path in targets.paths() {
            self.invalidator
                .invalidate(path)
                .await
                .map_err(|source| RevalidationError::Invalidation {
                    path: path.clone(),
                    source,
                })?;
        }

        let scope = match &targets {
            InvalidationTargets::Slug(_) => "slug",
            InvalidationTargets::Defaults(_) => "defaults",
        };
        info!(
            target = "clubhouse::revalidate",
            paths = targets.len(),
            scope,
            "Pages revalidated"
        );

        Ok(Revalidated {
            targets,
            at: OffsetDateTime::now_utc(),
        })
    }
}
