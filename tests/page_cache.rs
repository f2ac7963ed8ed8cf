mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, Uri, header},
    response::IntoResponse,
};
use serde_json::json;
use url::Url;

use clubhouse::config::OriginSettings;
use clubhouse::infra::origin::PageOrigin;
use support::{
    MemoryPolls, SECRET, TestApp, app, app_with_origin, body_bytes, get, page_key, post_json,
    send,
};

const GALLERY_BYTES: usize = 3 * 1024 * 1024;

/// Renderer running on an ephemeral port.
///
/// The first render of `/held` waits for `release` after signalling
/// `arrived`, so a test can act while that fetch is in flight.
#[derive(Default)]
struct Origin {
    renders: AtomicUsize,
    arrived: Notify,
    release: Notify,
}

async fn spawn_origin() -> (Url, Arc<Origin>) {
    let origin = Arc::new(Origin::default());

    async fn render(State(origin): State<Arc<Origin>>, uri: Uri) -> impl IntoResponse {
        let count = origin.renders.fetch_add(1, Ordering::SeqCst) + 1;
        match uri.path() {
            "/missing" => return (StatusCode::NOT_FOUND, "gone").into_response(),
            "/gallery" => {
                return (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "g".repeat(GALLERY_BYTES),
                )
                    .into_response();
            }
            "/held" if count == 1 => {
                origin.arrived.notify_one();
                origin.release.notified().await;
            }
            _ => {}
        }
        (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            format!("<p>{} render {count}</p>", uri.path()),
        )
            .into_response()
    }

    let router = Router::new().fallback(render).with_state(origin.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind origin");
    let addr = listener.local_addr().expect("origin addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("origin server");
    });

    let url = Url::parse(&format!("http://{addr}/")).expect("origin url");
    (url, origin)
}

async fn app_with_live_origin() -> (TestApp, Arc<Origin>) {
    let (url, origin) = spawn_origin().await;
    let client = PageOrigin::new(&OriginSettings {
        url: Some(url),
        timeout: Duration::from_secs(5),
    })
    .expect("origin client");
    (app_with_origin(MemoryPolls::default(), client), origin)
}

#[tokio::test]
async fn pages_are_served_from_cache_until_revalidated() {
    let (app, origin) = app_with_live_origin().await;

    let first = get(&app.router, "/news").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_bytes(first).await, "<p>/news render 1</p>");

    let second = get(&app.router, "/news").await;
    assert_eq!(body_bytes(second).await, "<p>/news render 1</p>");
    assert_eq!(origin.renders.load(Ordering::SeqCst), 1);
    assert!(app.pages.contains(&page_key("/news", "")));

    let response = post_json(
        &app.router,
        "/api/revalidate",
        json!({ "secret": SECRET, "slug": "/news" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let third = get(&app.router, "/news").await;
    assert_eq!(body_bytes(third).await, "<p>/news render 2</p>");
    assert_eq!(origin.renders.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn query_variants_are_cached_separately() {
    let (app, origin) = app_with_live_origin().await;

    get(&app.router, "/events?page=1").await;
    get(&app.router, "/events?page=2").await;
    get(&app.router, "/events?page=1").await;

    assert_eq!(origin.renders.load(Ordering::SeqCst), 2);
    assert_eq!(app.pages.len(), 2);
}

#[tokio::test]
async fn origin_errors_are_relayed_but_not_cached() {
    let (app, origin) = app_with_live_origin().await;

    for _ in 0..2 {
        let response = get(&app.router, "/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    assert_eq!(origin.renders.load(Ordering::SeqCst), 2);
    assert!(app.pages.is_empty());
}

#[tokio::test]
async fn revalidation_during_a_fill_is_not_undone() {
    let (app, origin) = app_with_live_origin().await;

    let router = app.router.clone();
    let in_flight = tokio::spawn(async move { body_bytes(get(&router, "/held").await).await });
    origin.arrived.notified().await;

    let response = post_json(
        &app.router,
        "/api/revalidate",
        json!({ "secret": SECRET, "slug": "/held" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    origin.release.notify_one();
    let first = in_flight.await.expect("in-flight request");
    assert_eq!(first, "<p>/held render 1</p>");
    assert!(!app.pages.contains(&page_key("/held", "")));

    let next = get(&app.router, "/held").await;
    assert_eq!(body_bytes(next).await, "<p>/held render 2</p>");
    assert!(app.pages.contains(&page_key("/held", "")));
}

#[tokio::test]
async fn pages_over_the_body_limit_are_relayed_uncached() {
    let (app, origin) = app_with_live_origin().await;

    for _ in 0..2 {
        let response = get(&app.router, "/gallery").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.len(), GALLERY_BYTES);
    }

    assert_eq!(origin.renders.load(Ordering::SeqCst), 2);
    assert!(app.pages.is_empty());
}

#[tokio::test]
async fn pages_without_origin_are_not_found() {
    let app = app(MemoryPolls::default());

    let response = get(&app.router, "/news").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.pages.is_empty());
}

#[tokio::test]
async fn pages_only_answer_get_and_head() {
    let app = app(MemoryPolls::default());

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/news")
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn health_probe_reflects_store_state() {
    let app = app(MemoryPolls::default());

    let healthy = get(&app.router, "/_health/db").await;
    assert_eq!(healthy.status(), StatusCode::NO_CONTENT);

    app.health.healthy.store(false, Ordering::SeqCst);
    let unhealthy = get(&app.router, "/_health/db").await;
    assert_eq!(unhealthy.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.pages.is_empty());
}
