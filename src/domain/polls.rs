//! Scheduling polls as seen by the deletion flow.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::secrets::secrets_match;

/// Content-store identifier of a scheduling poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(String);

impl PollId {
    /// Ids are opaque and taken verbatim; only blank ids are rejected.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::missing_field("pollId"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PollId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability secret issued to a poll's creator.
///
/// Presenting it authorizes deletion of that poll. The value never appears in
/// `Debug` output and is only compared in constant time.
#[derive(Clone)]
pub struct DeleteToken(String);

impl DeleteToken {
    /// Tokens are taken verbatim; only emptiness is rejected.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::missing_field("deleteToken"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn matches(&self, presented: &DeleteToken) -> bool {
        secrets_match(&self.0, &presented.0)
    }
}

impl fmt::Debug for DeleteToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DeleteToken(<redacted>)")
    }
}

/// Projection of a poll document used by the deletion flow.
#[derive(Debug, Clone)]
pub struct SchedulingPoll {
    pub id: PollId,
    pub title: String,
    pub delete_token: DeleteToken,
}

/// What a lookup observed about a poll.
#[derive(Debug, Clone)]
pub enum PollState {
    Exists(SchedulingPoll),
    Absent,
}

impl From<Option<SchedulingPoll>> for PollState {
    fn from(lookup: Option<SchedulingPoll>) -> Self {
        match lookup {
            Some(poll) => Self::Exists(poll),
            None => Self::Absent,
        }
    }
}

/// Result of a delete-by-id at the store. Both variants are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}
