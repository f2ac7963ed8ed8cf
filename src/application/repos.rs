//! Repository traits describing the content store adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::polls::{DeleteOutcome, PollId, SchedulingPoll};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("content store unavailable: {message}")]
    Unavailable { message: String },
    #[error("malformed document: {message}")]
    Malformed { message: String },
    #[error("content store timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Read and delete access to scheduling polls.
#[async_trait]
pub trait PollsRepo: Send + Sync {
    /// Fetch the `{id, title, delete_token}` projection of one poll.
    async fn find_poll(&self, id: &PollId) -> Result<Option<SchedulingPoll>, RepoError>;

    /// Remove a poll by id. A poll that is already gone is not an error.
    async fn delete_poll(&self, id: &PollId) -> Result<DeleteOutcome, RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
