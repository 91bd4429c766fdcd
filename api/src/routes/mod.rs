use axum::Router;

use anvaya_core::id::ObjectId;
use anvaya_core::validation::Validator;

use crate::error::AppError;
use crate::state::AppState;

pub mod agents;
pub mod comments;
pub mod health;
pub mod leads;
pub mod reports;
pub mod tags;

/// Every resource and report route, ready for `.with_state(..)`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(agents::router())
        .merge(leads::router())
        .merge(comments::router())
        .merge(tags::router())
        .merge(reports::router())
}

/// Parse an id taken from the URL path, e.g. `/leads/{id}`.
pub(crate) fn parse_path_id(raw: &str, resource: &str) -> Result<ObjectId, AppError> {
    raw.parse::<ObjectId>().map_err(|_| {
        let message = format!("Invalid {resource} ID.");
        let mut v = Validator::new();
        v.summarize(message.clone());
        v.reject("id", message, Some(serde_json::Value::String(raw.to_string())));
        AppError::from(v.into_errors())
    })
}
