pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{Router, routing::post};

use crate::infra::http::RouterState;

pub fn build_api_router() -> Router<RouterState> {
    Router::new()
        .route("/api/revalidate", post(handlers::revalidate))
        .route("/api/polls/delete", post(handlers::delete_poll))
}
