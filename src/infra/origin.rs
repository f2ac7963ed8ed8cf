//! Client for the external page renderer whose output the page cache stores.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::OriginSettings;
use crate::domain::paths::SitePath;

use super::error::InfraError;

const USER_AGENT: &str = concat!("clubhouse/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("no origin renderer is configured")]
    NotConfigured,
    #[error("invalid origin url for `{path}`: {source}")]
    Url {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("origin request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// A rendered page as returned by the origin.
#[derive(Debug, Clone)]
pub struct OriginPage {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub cache_control: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for OriginPage {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        if let Some(value) = self.content_type {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Some(value) = self.cache_control {
            headers.insert(header::CACHE_CONTROL, value);
        }
        response
    }
}

#[derive(Clone)]
pub struct PageOrigin {
    client: reqwest::Client,
    base: Option<Url>,
}

impl PageOrigin {
    pub fn new(settings: &OriginSettings) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::origin(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base: settings.url.clone(),
        })
    }

    /// An origin that answers every request with `NotConfigured`.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            base: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base.is_some()
    }

    pub async fn fetch(
        &self,
        path: &SitePath,
        query: Option<&str>,
    ) -> Result<OriginPage, OriginError> {
        let url = self.page_url(path, query)?;
        debug!(target = "clubhouse::origin", url = %url, "Fetching page from origin");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let cache_control = response.headers().get(header::CACHE_CONTROL).cloned();
        let body = response.bytes().await?;

        Ok(OriginPage {
            status,
            content_type,
            cache_control,
            body,
        })
    }

    fn page_url(&self, path: &SitePath, query: Option<&str>) -> Result<Url, OriginError> {
        let base = self.base.as_ref().ok_or(OriginError::NotConfigured)?;
        let mut url = base
            .join(path.as_str().trim_start_matches('/'))
            .map_err(|source| OriginError::Url {
                path: path.to_string(),
                source,
            })?;
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }
}
