use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use anvaya_core::error::ApiError;
use anvaya_core::leads::{
    CreateLeadRequest, LeadDeletedResponse, LeadResponse, LeadSort, ListLeadsQuery,
    UpdateLeadRequest,
};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::routes::agents::ensure_agent_exists;
use crate::routes::parse_path_id;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/leads", get(list_leads).post(create_lead))
        .route(
            "/leads/{id}",
            get(get_lead).put(update_lead).delete(delete_lead),
        )
}

/// List leads, newest first
///
/// Filters combine with AND. `tags` may be repeated and matches leads that
/// carry any of the given tags.
#[utoipa::path(
    get,
    path = "/leads",
    params(
        ("salesAgent" = Option<String>, Query, description = "Assigned agent ID"),
        ("status" = Option<String>, Query, description = "Lead status"),
        ("source" = Option<String>, Query, description = "Lead source"),
        ("tags" = Option<Vec<String>>, Query, description = "Any of these tags, e.g. ?tags=a&tags=b")
    ),
    responses(
        (status = 200, description = "Matching leads", body = Vec<LeadResponse>),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn list_leads(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let query = ListLeadsQuery::from_pairs(url::form_urlencoded::parse(
        query.as_deref().unwrap_or_default().as_bytes(),
    ));
    let filter = query.validate()?;

    let leads = state.store.find_leads(&filter, LeadSort::NewestFirst).await?;
    let leads: Vec<LeadResponse> = leads.into_iter().map(LeadResponse::from).collect();

    Ok(Json(leads))
}

/// Get a single lead
#[utoipa::path(
    get,
    path = "/leads/{id}",
    params(("id" = String, Path, description = "Lead ID")),
    responses(
        (status = 200, description = "Lead found", body = LeadResponse),
        (status = 400, description = "Malformed ID", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "lead")?;
    let lead = state
        .store
        .get_lead(id)
        .await?
        .ok_or_else(|| AppError::lead_not_found(id))?;

    Ok(Json(LeadResponse::from(lead)))
}

/// Create a lead
///
/// Omitted status, tags and priority default to New, no tags and Medium.
/// The assigned agent must exist.
#[utoipa::path(
    post,
    path = "/leads",
    request_body = CreateLeadRequest,
    responses(
        (status = 201, description = "Lead created", body = LeadResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Sales agent not found", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn create_lead(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateLeadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fields = req.validate()?;
    ensure_agent_exists(state.store.as_ref(), fields.sales_agent).await?;

    let lead = state.store.insert_lead(fields, Utc::now()).await?;

    tracing::info!(
        lead_id = %lead.lead.id,
        agent_id = %lead.lead.sales_agent,
        status = %lead.lead.status,
        "Lead created"
    );

    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

/// Replace a lead
///
/// Every field except `tags` is required. Saving with status Closed stamps
/// `closedAt`; moving away from Closed keeps the earlier stamp.
#[utoipa::path(
    put,
    path = "/leads/{id}",
    params(("id" = String, Path, description = "Lead ID")),
    request_body = UpdateLeadRequest,
    responses(
        (status = 200, description = "Lead updated", body = LeadResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Lead or sales agent not found", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateLeadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "lead")?;
    let fields = req.validate()?;
    ensure_agent_exists(state.store.as_ref(), fields.sales_agent).await?;

    let lead = state
        .store
        .replace_lead(id, fields, Utc::now())
        .await?
        .ok_or_else(|| AppError::lead_not_found(id))?;

    tracing::info!(
        lead_id = %id,
        status = %lead.lead.status,
        closed_at = ?lead.lead.closed_at,
        "Lead updated"
    );

    Ok(Json(LeadResponse::from(lead)))
}

/// Delete a lead and its comments
#[utoipa::path(
    delete,
    path = "/leads/{id}",
    params(("id" = String, Path, description = "Lead ID")),
    responses(
        (status = 200, description = "Lead deleted", body = LeadDeletedResponse),
        (status = 400, description = "Malformed ID", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "lead")?;
    if !state.store.delete_lead(id).await? {
        return Err(AppError::lead_not_found(id));
    }
    // Not atomic with the lead delete: a failure here leaves orphaned comments.
    let comments_deleted = state.store.delete_comments_for_lead(id).await?;

    tracing::info!(lead_id = %id, comments_deleted, "Lead deleted");

    Ok(Json(LeadDeletedResponse {
        message: "Lead deleted successfully.".to_string(),
        comments_deleted,
    }))
}
