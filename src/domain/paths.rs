//! Site-relative paths and the invalidation targets derived from them.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::error::DomainError;

/// A normalised, site-relative path such as `/events/spring-social`.
///
/// Paths always start with `/` and never end with one (except the root).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SitePath(String);

impl SitePath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Validate caller-supplied input. A missing leading `/` is added.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_path(raw, "path is empty"));
        }
        if trimmed.contains("://") || trimmed.starts_with("//") {
            return Err(DomainError::invalid_path(raw, "absolute URLs are not allowed"));
        }
        if trimmed.contains(['?', '#']) {
            return Err(DomainError::invalid_path(
                raw,
                "query strings and fragments are not allowed",
            ));
        }
        if trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(DomainError::invalid_path(
                raw,
                "whitespace and control characters are not allowed",
            ));
        }

        Ok(Self(normalise(trimmed)))
    }

    /// Key a request URI path. Request paths are already well formed, so only
    /// the trailing-slash normalisation applies.
    pub fn from_request_path(path: &str) -> Self {
        Self(normalise(path))
    }

    /// Append one segment, validating the result.
    pub fn join(&self, segment: &str) -> Result<Self, DomainError> {
        if segment.contains('/') {
            return Err(DomainError::invalid_path(
                segment,
                "segment must not contain `/`",
            ));
        }
        let base = self.0.trim_end_matches('/');
        Self::parse(&format!("{base}/{segment}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SitePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalise(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// The set of paths a single revalidation marks stale.
///
/// A slug selects exactly that one path; without a slug the configured
/// default set is used. The two cases never mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTargets {
    Slug(SitePath),
    Defaults(BTreeSet<SitePath>),
}

impl InvalidationTargets {
    pub fn paths(&self) -> Vec<&SitePath> {
        match self {
            Self::Slug(path) => vec![path],
            Self::Defaults(paths) => paths.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Slug(_) => 1,
            Self::Defaults(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
