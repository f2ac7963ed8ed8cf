use serde::{Deserialize, Serialize};

use crate::application::polls::PollDeleted;
use crate::application::revalidation::Revalidated;
use crate::domain::paths::InvalidationTargets;

/// Webhook payload sent by the CMS when content changes.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RevalidateRequest {
    pub secret: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    /// Unix epoch milliseconds.
    pub now: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
}

impl From<Revalidated> for RevalidateResponse {
    fn from(value: Revalidated) -> Self {
        let now = (value.at.unix_timestamp_nanos() / 1_000_000) as i64;
        let (slug, paths) = match value.targets {
            InvalidationTargets::Slug(path) => (Some(path.as_str().to_string()), None),
            InvalidationTargets::Defaults(paths) => (
                None,
                Some(paths.iter().map(|p| p.as_str().to_string()).collect()),
            ),
        };

        Self {
            revalidated: true,
            now,
            slug,
            paths,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeletePollRequest {
    pub poll_id: Option<String>,
    pub delete_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePollResponse {
    pub message: String,
    pub deleted_id: String,
}

impl From<PollDeleted> for DeletePollResponse {
    fn from(value: PollDeleted) -> Self {
        Self {
            message: "Poll deleted successfully".to_string(),
            deleted_id: value.id.as_str().to_string(),
        }
    }
}
