use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use anvaya_core::error::ApiError;
use anvaya_core::tags::{CreateTagRequest, Tag};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store::StoreError;

pub fn router() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags).post(create_tag))
}

/// List all tags
#[utoipa::path(
    get,
    path = "/tags",
    responses(
        (status = 200, description = "Tags, oldest first", body = Vec<Tag>),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "tags"
)]
pub async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tags = state.store.list_tags().await?;
    Ok(Json(tags))
}

/// Create a tag
///
/// Tag names are unique.
#[utoipa::path(
    post,
    path = "/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = Tag),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 409, description = "Tag name already taken", body = ApiError)
    ),
    tag = "tags"
)]
pub async fn create_tag(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_tag = req.validate()?;
    let name = new_tag.name.clone();

    let tag = match state.store.insert_tag(new_tag, Utc::now()).await {
        Ok(tag) => tag,
        Err(StoreError::Duplicate { .. }) => {
            return Err(AppError::Conflict {
                message: format!("Tag with name '{name}' already exists."),
                field: Some("name".to_string()),
                received: Some(serde_json::Value::String(name)),
            });
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(tag_id = %tag.id, name = %tag.name, "Tag created");

    Ok((StatusCode::CREATED, Json(tag)))
}
