use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use anvaya_core::agents::{CreateAgentRequest, SalesAgent};
use anvaya_core::error::ApiError;
use anvaya_core::id::ObjectId;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store::Store;

pub fn router() -> Router<AppState> {
    Router::new().route("/agents", get(list_agents).post(create_agent))
}

/// Load an agent or fail with 404.
pub(crate) async fn ensure_agent_exists(
    store: &dyn Store,
    id: ObjectId,
) -> Result<SalesAgent, AppError> {
    store
        .get_agent(id)
        .await?
        .ok_or_else(|| AppError::agent_not_found(id))
}

/// List all sales agents
#[utoipa::path(
    get,
    path = "/agents",
    responses(
        (status = 200, description = "Sales agents, oldest first", body = Vec<SalesAgent>),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn list_agents(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let agents = state.store.list_agents().await?;
    Ok(Json(agents))
}

/// Create a sales agent
#[utoipa::path(
    post,
    path = "/agents",
    request_body = CreateAgentRequest,
    responses(
        (status = 201, description = "Agent created", body = SalesAgent),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn create_agent(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateAgentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_agent = req.validate()?;
    let agent = state.store.insert_agent(new_agent, Utc::now()).await?;

    tracing::info!(agent_id = %agent.id, "Sales agent created");

    Ok((StatusCode::CREATED, Json(agent)))
}
