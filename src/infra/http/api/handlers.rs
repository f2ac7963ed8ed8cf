use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::application::polls::{DeletePollCommand, PollDeletionError};
use crate::application::revalidation::{RevalidateCommand, RevalidationError};

use super::error::ApiError;
use super::models::*;
use super::state::ApiState;

pub async fn revalidate(
    State(state): State<ApiState>,
    payload: Result<Json<RevalidateRequest>, JsonRejection>,
) -> Result<Json<RevalidateResponse>, ApiError> {
    let Json(body) = payload.map_err(rejection_to_api)?;

    let revalidated = state
        .revalidation
        .revalidate(RevalidateCommand {
            secret: body.secret,
            slug: body.slug,
        })
        .await
        .map_err(revalidation_to_api)?;

    Ok(Json(RevalidateResponse::from(revalidated)))
}

pub async fn delete_poll(
    State(state): State<ApiState>,
    payload: Result<Json<DeletePollRequest>, JsonRejection>,
) -> Result<Json<DeletePollResponse>, ApiError> {
    let Json(body) = payload.map_err(rejection_to_api)?;

    let deleted = state
        .polls
        .delete(DeletePollCommand {
            poll_id: body.poll_id,
            delete_token: body.delete_token,
        })
        .await
        .map_err(poll_deletion_to_api)?;

    Ok(Json(DeletePollResponse::from(deleted)))
}

fn rejection_to_api(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
}

fn revalidation_to_api(err: RevalidationError) -> ApiError {
    match err {
        RevalidationError::Unauthorized => ApiError::unauthorized("Invalid secret"),
        RevalidationError::InvalidSlug(err) => {
            ApiError::bad_request("Invalid slug", Some(err.to_string()))
        }
        err @ RevalidationError::Invalidation { .. } => {
            ApiError::internal("Error revalidating", error_chain(&err))
        }
    }
}

fn poll_deletion_to_api(err: PollDeletionError) -> ApiError {
    match err {
        PollDeletionError::BadRequest(err) => ApiError::bad_request(
            "Poll ID and delete token are required",
            Some(err.to_string()),
        ),
        PollDeletionError::NotFound => ApiError::not_found("Poll not found"),
        PollDeletionError::Forbidden => {
            ApiError::forbidden("You may only delete polls you created")
        }
        err @ PollDeletionError::Store(_) => ApiError::internal(
            "Something went wrong, please try again later",
            error_chain(&err),
        ),
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(inner) = current {
        parts.push(inner.to_string());
        current = inner.source();
    }
    parts.join(": ")
}
