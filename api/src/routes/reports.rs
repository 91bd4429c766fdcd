//! Aggregate views over leads. Each handler loads the relevant slice from the
//! store and hands it to the pure functions in `anvaya_core::reports`.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use anvaya_core::error::ApiError;
use anvaya_core::leads::{Lead, LeadFilter, LeadSort};
use anvaya_core::reports::{self, AgentClosedCount, ClosedLeadEntry, PipelineSummary};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/report/last-week", get(closed_last_week))
        .route("/report/pipeline", get(pipeline_summary))
        .route("/report/closed-by-agent", get(closed_by_agent))
        .route("/report/status-distribution", get(status_distribution))
}

async fn load_leads(state: &AppState, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
    let found = state.store.find_leads(filter, LeadSort::NewestFirst).await?;
    Ok(found.into_iter().map(|e| e.lead).collect())
}

/// Leads closed in the last 7 days
#[utoipa::path(
    get,
    path = "/report/last-week",
    responses(
        (status = 200, description = "Recently closed leads, most recent first", body = Vec<ClosedLeadEntry>),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn closed_last_week(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let leads = state
        .store
        .find_leads(
            &reports::closed_last_week_filter(now),
            LeadSort::RecentlyClosedFirst,
        )
        .await?;
    Ok(Json(reports::closed_last_week(&leads, now)))
}

/// Open pipeline size by status
#[utoipa::path(
    get,
    path = "/report/pipeline",
    responses(
        (status = 200, description = "Leads not yet closed", body = PipelineSummary),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn pipeline_summary(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let leads = load_leads(&state, &reports::pipeline_filter()).await?;
    Ok(Json(reports::pipeline_summary(&leads)))
}

/// Closed leads per sales agent
#[utoipa::path(
    get,
    path = "/report/closed-by-agent",
    responses(
        (status = 200, description = "Closed counts, highest first", body = Vec<AgentClosedCount>),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn closed_by_agent(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let leads = state
        .store
        .find_leads(&reports::closed_filter(), LeadSort::NewestFirst)
        .await?;
    Ok(Json(reports::closed_by_agent(&leads)))
}

/// Lead counts for every status in use
#[utoipa::path(
    get,
    path = "/report/status-distribution",
    responses(
        (status = 200, description = "Map of status to lead count", body = serde_json::Value),
        (status = 500, description = "Store failure", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn status_distribution(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let leads = load_leads(&state, &LeadFilter::default()).await?;
    Ok(Json(reports::status_distribution(&leads)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{app, get, seed_agent, seed_lead};
    use anvaya_core::id::ObjectId;
    use axum::Router;
    use axum::http::StatusCode;
    use serde_json::json;

    /// {New: 2, Contacted: 1, Closed: 3}, two of the closed leads owned by Priya.
    async fn seed_fixture(app: &Router) -> (String, String) {
        let priya = seed_agent(app, "Priya Sharma").await;
        let rahul = seed_agent(app, "Rahul Verma").await;
        seed_lead(app, &priya, json!({"name": "N1"})).await;
        seed_lead(app, &rahul, json!({"name": "N2"})).await;
        seed_lead(app, &rahul, json!({"name": "C1", "status": "Contacted"})).await;
        seed_lead(app, &priya, json!({"name": "W1", "status": "Closed"})).await;
        seed_lead(app, &rahul, json!({"name": "W2", "status": "Closed"})).await;
        seed_lead(app, &priya, json!({"name": "W3", "status": "Closed"})).await;
        (priya, rahul)
    }

    #[tokio::test]
    async fn pipeline_and_distribution_counts() {
        let (app, _) = app();
        seed_fixture(&app).await;

        let (status, body) = get(&app, "/report/pipeline").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"totalLeadsInPipeline": 3, "byStatus": {"New": 2, "Contacted": 1}})
        );

        let (status, body) = get(&app, "/report/status-distribution").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"New": 2, "Contacted": 1, "Closed": 3}));
    }

    #[tokio::test]
    async fn last_week_lists_closed_leads_most_recent_first() {
        let (app, _) = app();
        seed_fixture(&app).await;

        let (status, body) = get(&app, "/report/last-week").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().expect("report should be an array");
        let names: Vec<&str> = entries.iter().filter_map(|e| e["name"].as_str()).collect();
        assert_eq!(names, vec!["W3", "W2", "W1"]);
        assert_eq!(entries[0]["salesAgent"], "Priya Sharma");
        assert!(entries[0]["closedAt"].is_string());
    }

    #[tokio::test]
    async fn closed_by_agent_skips_unresolved_agents() {
        let (app, store) = app();
        let (priya, rahul) = seed_fixture(&app).await;

        let (status, body) = get(&app, "/report/closed-by-agent").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"agentId": priya, "agentName": "Priya Sharma", "closedCount": 2},
                {"agentId": rahul, "agentName": "Rahul Verma", "closedCount": 1},
            ])
        );

        store.remove_agent(rahul.parse::<ObjectId>().expect("agent id should parse"));
        let (_, body) = get(&app, "/report/closed-by-agent").await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn reports_are_empty_without_leads() {
        let (app, _) = app();
        let (_, body) = get(&app, "/report/pipeline").await;
        assert_eq!(body, json!({"totalLeadsInPipeline": 0, "byStatus": {}}));
        let (_, body) = get(&app, "/report/last-week").await;
        assert_eq!(body, json!([]));
    }
}
