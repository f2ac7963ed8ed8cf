//! Capability-token deletion of scheduling polls.
//!
//! The flow is lookup, compare, delete. Lookup and delete are separate store
//! round-trips, so two holders of the right token can both pass the compare;
//! the store answers the loser's delete with [`DeleteOutcome::AlreadyGone`]
//! and both callers see success.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::repos::{PollsRepo, RepoError};
use crate::cache::PageCacheInvalidator;
use crate::domain::error::DomainError;
use crate::domain::paths::SitePath;
use crate::domain::polls::{DeleteOutcome, DeleteToken, PollId, PollState};

#[derive(Debug, Error)]
pub enum PollDeletionError {
    #[error(transparent)]
    BadRequest(#[from] DomainError),
    #[error("poll not found")]
    NotFound,
    #[error("delete token does not match")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] RepoError),
}

impl PollDeletionError {
    fn outcome(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Store(_) => "internal",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeletePollCommand {
    pub poll_id: Option<String>,
    pub delete_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PollDeleted {
    pub id: PollId,
    pub outcome: DeleteOutcome,
}

#[derive(Clone)]
pub struct PollDeletionService {
    repo: Arc<dyn PollsRepo>,
    invalidator: Option<Arc<dyn PageCacheInvalidator>>,
    page_prefix: SitePath,
}

impl PollDeletionService {
    pub fn new(repo: Arc<dyn PollsRepo>) -> Self {
        Self {
            repo,
            invalidator: None,
            page_prefix: SitePath::root(),
        }
    }

    /// Drop the cached rendering of a poll's page after it is deleted.
    pub fn with_page_invalidation(
        mut self,
        invalidator: Arc<dyn PageCacheInvalidator>,
        page_prefix: SitePath,
    ) -> Self {
        self.invalidator = Some(invalidator);
        self.page_prefix = page_prefix;
        self
    }

    pub async fn delete(&self, cmd: DeletePollCommand) -> Result<PollDeleted, PollDeletionError> {
        let result = self.run(cmd).await;
        let outcome = match &result {
            Ok(_) => "deleted",
            Err(err) => err.outcome(),
        };
        counter!("clubhouse_poll_delete_total", "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, cmd: DeletePollCommand) -> Result<PollDeleted, PollDeletionError> {
        let id = PollId::parse(cmd.poll_id.as_deref().unwrap_or_default())?;
        let presented = DeleteToken::parse(cmd.delete_token.as_deref().unwrap_or_default())?;

        let poll = match PollState::from(self.repo.find_poll(&id).await?) {
            PollState::Exists(poll) => poll,
            PollState::Absent => return Err(PollDeletionError::NotFound),
        };

        if !poll.delete_token.matches(&presented) {
            warn!(
                target = "clubhouse::polls",
                poll_id = %id,
                "Rejected poll deletion with mismatched token"
            );
            return Err(PollDeletionError::Forbidden);
        }

        let outcome = self.repo.delete_poll(&id).await?;
        if outcome == DeleteOutcome::AlreadyGone {
            debug!(
                target = "clubhouse::polls",
                poll_id = %id,
                "Poll vanished between lookup and delete"
            );
        }

        info!(
            target = "clubhouse::polls",
            poll_id = %id,
            title = %poll.title,
            "Poll deleted"
        );

        self.invalidate_poll_pages(&id).await;

        Ok(PollDeleted { id, outcome })
    }

    async fn invalidate_poll_pages(&self, id: &PollId) {
        let Some(invalidator) = self.invalidator.as_ref() else {
            return;
        };

        let mut paths = vec![self.page_prefix.clone()];
        match self.page_prefix.join(id.as_str()) {
            Ok(path) => paths.push(path),
            Err(err) => debug!(
                target = "clubhouse::polls",
                poll_id = %id,
                error = %err,
                "Poll id does not form a page path"
            ),
        }

        for path in paths {
            if let Err(err) = invalidator.invalidate(&path).await {
                warn!(
                    target = "clubhouse::polls",
                    path = %path,
                    error = %err,
                    "Failed to invalidate poll page after deletion"
                );
            }
        }
    }
}
