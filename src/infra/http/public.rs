use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, Uri, header::ALLOW},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{error::ErrorReport, repos::StoreHealth},
    cache::{CacheState, page_cache_layer},
    domain::paths::SitePath,
    infra::origin::{OriginError, PageOrigin},
};

use super::{RouterState, db_health_response};

#[derive(Clone)]
pub struct HttpState {
    pub origin: Arc<PageOrigin>,
    pub health: Arc<dyn StoreHealth>,
    pub cache: Option<CacheState>,
}

pub fn build_public_router(state: &RouterState) -> Router<RouterState> {
    // Every public page goes through the page cache, falling back to the origin.
    let cached_routes = Router::new().fallback(render_page);

    let cached_routes = if let Some(cache_state) = state.http.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            page_cache_layer,
        ))
    } else {
        cached_routes
    };

    let uncached_routes = Router::new().route("/_health/db", get(public_health));

    cached_routes.merge(uncached_routes)
}

async fn render_page(State(state): State<HttpState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        let mut response =
            (StatusCode::METHOD_NOT_ALLOWED, [(ALLOW, "GET, HEAD")]).into_response();
        ErrorReport::from_message(
            "infra::http::public",
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{method} is not served for pages"),
        )
        .attach(&mut response);
        return response;
    }

    let path = SitePath::from_request_path(uri.path());
    match state.origin.fetch(&path, uri.query()).await {
        Ok(page) => page.into_response(),
        Err(OriginError::NotConfigured) => {
            let mut response = StatusCode::NOT_FOUND.into_response();
            ErrorReport::from_message(
                "infra::http::public",
                StatusCode::NOT_FOUND,
                "no origin renderer configured",
            )
            .attach(&mut response);
            response
        }
        Err(err) => {
            let mut response = StatusCode::BAD_GATEWAY.into_response();
            ErrorReport::from_error("infra::http::public", StatusCode::BAD_GATEWAY, &err)
                .attach(&mut response);
            response
        }
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}
