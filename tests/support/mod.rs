#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use tokio::sync::Barrier;
use tower::ServiceExt;

use clubhouse::application::polls::PollDeletionService;
use clubhouse::application::repos::{PollsRepo, RepoError, StoreHealth};
use clubhouse::application::revalidation::RevalidationService;
use clubhouse::cache::{CacheConfig, CacheState, CachedPage, PageKey, PageStore};
use clubhouse::config::RevalidationSettings;
use clubhouse::domain::paths::SitePath;
use clubhouse::domain::polls::{DeleteOutcome, DeleteToken, PollId, SchedulingPoll};
use clubhouse::domain::secrets::RevalidationSecret;
use clubhouse::infra::http::{self, ApiState, HttpState, RouterState};
use clubhouse::infra::origin::PageOrigin;

pub const SECRET: &str = "webhook-secret";
pub const DEFAULT_PATHS: [&str; 3] = ["/", "/events", "/news"];

/// In-memory poll store that counts every call it receives.
#[derive(Default)]
pub struct MemoryPolls {
    polls: Mutex<HashMap<String, (String, String)>>,
    pub finds: AtomicUsize,
    pub deletes: AtomicUsize,
    pub removed: AtomicUsize,
    pub broken: AtomicBool,
    lookup_gate: Option<Arc<Barrier>>,
}

impl MemoryPolls {
    pub fn with_poll(id: &str, title: &str, token: &str) -> Self {
        let store = Self::default();
        store.insert(id, title, token);
        store
    }

    /// Every lookup waits on `gate` before returning, so concurrent callers
    /// all pass the lookup before any of them deletes.
    pub fn gated(mut self, gate: Arc<Barrier>) -> Self {
        self.lookup_gate = Some(gate);
        self
    }

    pub fn insert(&self, id: &str, title: &str, token: &str) {
        self.polls
            .lock()
            .expect("polls lock")
            .insert(id.to_string(), (title.to_string(), token.to_string()));
    }

    pub fn get(&self, id: &str) -> Option<(String, String)> {
        self.polls.lock().expect("polls lock").get(id).cloned()
    }

    pub fn store_calls(&self) -> usize {
        self.finds.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollsRepo for MemoryPolls {
    async fn find_poll(&self, id: &PollId) -> Result<Option<SchedulingPoll>, RepoError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable {
                message: "connection refused by db.internal:5432".to_string(),
            });
        }

        let found = self.get(id.as_str());
        if let Some(gate) = self.lookup_gate.as_ref() {
            gate.wait().await;
        }

        Ok(found.map(|(title, token)| SchedulingPoll {
            id: id.clone(),
            title,
            delete_token: DeleteToken::parse(&token).expect("stored token"),
        }))
    }

    async fn delete_poll(&self, id: &PollId) -> Result<DeleteOutcome, RepoError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let removed = self
            .polls
            .lock()
            .expect("polls lock")
            .remove(id.as_str())
            .is_some();
        if removed {
            self.removed.fetch_add(1, Ordering::SeqCst);
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }
}

pub struct FixedHealth {
    pub healthy: AtomicBool,
}

impl FixedHealth {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
        }
    }
}

#[async_trait]
impl StoreHealth for FixedHealth {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub polls: Arc<MemoryPolls>,
    pub pages: Arc<PageStore>,
    pub health: Arc<FixedHealth>,
}

pub fn revalidation_settings() -> Arc<RevalidationSettings> {
    let default_paths: BTreeSet<SitePath> = DEFAULT_PATHS
        .into_iter()
        .map(|p| SitePath::parse(p).expect("default path"))
        .collect();
    Arc::new(RevalidationSettings {
        secret: RevalidationSecret::new(SECRET).expect("secret"),
        default_paths,
    })
}

pub fn app(polls: MemoryPolls) -> TestApp {
    app_with_origin(polls, PageOrigin::disabled())
}

pub fn app_with_origin(polls: MemoryPolls, origin: PageOrigin) -> TestApp {
    let polls = Arc::new(polls);
    let cache_config = CacheConfig::default();
    let pages = Arc::new(PageStore::new(&cache_config));
    let health = Arc::new(FixedHealth::new(true));

    let revalidation = Arc::new(RevalidationService::new(
        revalidation_settings(),
        pages.clone(),
    ));
    let deletion = Arc::new(
        PollDeletionService::new(polls.clone())
            .with_page_invalidation(pages.clone(), SitePath::parse("/polls").expect("prefix")),
    );

    let state = RouterState {
        http: HttpState {
            origin: Arc::new(origin),
            health: health.clone(),
            cache: Some(CacheState {
                config: cache_config,
                store: pages.clone(),
            }),
        },
        api: ApiState {
            revalidation,
            polls: deletion,
        },
    };

    TestApp {
        router: http::build_router(state),
        polls,
        pages,
        health,
    }
}

pub fn page_key(path: &str, query: &str) -> PageKey {
    PageKey::new(SitePath::from_request_path(path), query)
}

pub fn seed_page(pages: &PageStore, path: &str, query: &str) {
    pages.put(
        page_key(path, query),
        CachedPage {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Bytes::from(format!("<h1>{path}</h1>")),
        },
    );
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

pub async fn post_json(router: &Router, uri: &str, body: serde_json::Value) -> Response {
    post_raw(router, uri, body.to_string()).await
}

pub async fn post_raw(router: &Router, uri: &str, body: impl Into<Body>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("request should build");
    send(router, request).await
}

pub async fn get(router: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(router, request).await
}

pub async fn body_bytes(response: Response) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
}

pub async fn json_body(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = serde_json::from_slice(&bytes).expect("response body should be json");
    (status, value)
}
