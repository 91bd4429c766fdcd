use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use anvaya_core::comments::{CommentResponse, CreateCommentRequest};
use anvaya_core::error::ApiError;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::routes::agents::ensure_agent_exists;
use crate::routes::parse_path_id;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/leads/{id}/comments",
        get(list_comments).post(create_comment),
    )
}

/// List comments on a lead, newest first
#[utoipa::path(
    get,
    path = "/leads/{id}/comments",
    params(("id" = String, Path, description = "Lead ID")),
    responses(
        (status = 200, description = "Comments on the lead", body = Vec<CommentResponse>),
        (status = 400, description = "Malformed ID", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lead_id = parse_path_id(&id, "lead")?;
    if state.store.get_lead(lead_id).await?.is_none() {
        return Err(AppError::lead_not_found(lead_id));
    }

    let comments = state.store.find_comments(lead_id).await?;
    let comments: Vec<CommentResponse> = comments.into_iter().map(CommentResponse::from).collect();

    Ok(Json(comments))
}

/// Add a comment to a lead
///
/// The author must be an existing sales agent.
#[utoipa::path(
    post,
    path = "/leads/{id}/comments",
    params(("id" = String, Path, description = "Lead ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Lead or author not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_comment = req.validate(&id)?;
    if state.store.get_lead(new_comment.lead).await?.is_none() {
        return Err(AppError::lead_not_found(new_comment.lead));
    }
    ensure_agent_exists(state.store.as_ref(), new_comment.author).await?;

    let comment = state.store.insert_comment(new_comment, Utc::now()).await?;

    tracing::info!(
        comment_id = %comment.comment.id,
        lead_id = %comment.comment.lead,
        agent_id = %comment.comment.author,
        "Comment added"
    );

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}
