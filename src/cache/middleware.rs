//! Page cache middleware.
//!
//! Serves cached renderings for `GET` requests and stores successful responses
//! on a miss. Regeneration is lazy: an invalidated path is re-fetched the next
//! time someone asks for it.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, Limited};
use tracing::{debug, instrument};

use crate::application::error::ErrorReport;
use crate::domain::paths::SitePath;

use super::{
    CacheConfig,
    keys::PageKey,
    store::{CachedPage, PageStore},
};

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<PageStore>,
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageKey::new(
        SitePath::from_request_path(request.uri().path()),
        request.uri().query().unwrap_or(""),
    );

    if let Some(cached) = cache.store.get(&key) {
        debug!(cache = "page", outcome = "hit", "serving cached page");
        return build_response(cached);
    }

    debug!(cache = "page", outcome = "miss", "cache miss, executing handler");
    let generation = cache.store.generation(&key.path);
    let response = next.run(request).await;

    if !should_store(&response, cache.config.body_limit_bytes) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match BodyExt::collect(Limited::new(body, cache.config.body_limit_bytes)).await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            let mut response = StatusCode::BAD_GATEWAY.into_response();
            ErrorReport::from_message(
                "cache::middleware",
                StatusCode::BAD_GATEWAY,
                format!("failed to buffer rendered page: {err}"),
            )
            .attach(&mut response);
            return response;
        }
    };

    let cached = CachedPage {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    cache.store.fill(key, cached, generation);

    Response::from_parts(parts, Body::from(bytes))
}

fn should_store(response: &Response, body_limit: usize) -> bool {
    if response.status() != StatusCode::OK {
        return false;
    }

    let headers = response.headers();
    if headers.contains_key(header::SET_COOKIE) {
        return false;
    }

    if headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
    {
        return false;
    }

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|length| length > body_limit) {
        return false;
    }

    // Streams of unknown length are relayed as they are.
    response
        .body()
        .size_hint()
        .upper()
        .and_then(|upper| usize::try_from(upper).ok())
        .is_some_and(|upper| upper <= body_limit)
}

fn build_response(cached: CachedPage) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
