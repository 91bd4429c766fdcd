use std::net::SocketAddr;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;
mod store;

use config::{Config, ConfigError};
use state::AppState;
use store::PgStore;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Anvaya API",
        version = "0.1.0",
        description = "Sales lead tracking: agents, leads, comments, tags and pipeline reports."
    ),
    paths(
        routes::health::welcome,
        routes::health::health_check,
        routes::agents::list_agents,
        routes::agents::create_agent,
        routes::leads::list_leads,
        routes::leads::get_lead,
        routes::leads::create_lead,
        routes::leads::update_lead,
        routes::leads::delete_lead,
        routes::comments::list_comments,
        routes::comments::create_comment,
        routes::tags::list_tags,
        routes::tags::create_tag,
        routes::reports::closed_last_week,
        routes::reports::pipeline_summary,
        routes::reports::closed_by_agent,
        routes::reports::status_distribution,
    ),
    components(schemas(
        routes::health::HealthResponse,
        anvaya_core::error::ApiError,
        anvaya_core::validation::Violation,
        anvaya_core::id::ObjectId,
        anvaya_core::agents::SalesAgent,
        anvaya_core::agents::AgentRef,
        anvaya_core::agents::CreateAgentRequest,
        anvaya_core::leads::LeadSource,
        anvaya_core::leads::LeadStatus,
        anvaya_core::leads::Priority,
        anvaya_core::leads::CreateLeadRequest,
        anvaya_core::leads::UpdateLeadRequest,
        anvaya_core::leads::LeadResponse,
        anvaya_core::leads::LeadDeletedResponse,
        anvaya_core::comments::CreateCommentRequest,
        anvaya_core::comments::CommentResponse,
        anvaya_core::tags::Tag,
        anvaya_core::tags::CreateTagRequest,
        anvaya_core::reports::ClosedLeadEntry,
        anvaya_core::reports::PipelineSummary,
        anvaya_core::reports::AgentClosedCount,
    ))
)]
struct ApiDoc;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

fn build_app(state: AppState, config: &Config) -> Router {
    let cors_layer = middleware::cors::build_cors_layer(config.cors_origins.as_deref());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(state)
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let app = build_app(AppState::new(PgStore::new(pool)), &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Anvaya API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anvaya_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Err(err) = run().await {
        tracing::error!("Anvaya API failed to start: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/health",
            "/agents",
            "/leads",
            "/leads/{id}",
            "/leads/{id}/comments",
            "/tags",
            "/report/last-week",
            "/report/pipeline",
            "/report/closed-by-agent",
            "/report/status-distribution",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
    }
}
