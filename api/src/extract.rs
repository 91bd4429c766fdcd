//! Request body extraction.
//!
//! Handlers take `AppJson<T>` instead of `axum::Json<T>` so a body that is
//! missing, unparseable or of the wrong shape answers with the same
//! `validation_failed` JSON error as every other bad input, never axum's
//! plain-text 415/422.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

const BODY_DOCS_HINT: &str = "Send a JSON object with Content-Type: application/json. \
     Field names are camelCase; /api-doc/openapi.json has the schema of every endpoint.";

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| AppJson(value))
            .map_err(body_error)
    }
}

fn body_error(rejection: JsonRejection) -> AppError {
    let detail = rejection.body_text();
    let (message, field) = match &rejection {
        JsonRejection::MissingJsonContentType(_) => (
            "Request body must be sent as application/json.".to_string(),
            "headers.content-type".to_string(),
        ),
        JsonRejection::JsonSyntaxError(_) => (
            format!("Request body is not valid JSON: {detail}"),
            "body".to_string(),
        ),
        JsonRejection::JsonDataError(_) => (
            format!("Request body has the wrong shape: {detail}"),
            rejected_field(&detail).unwrap_or_else(|| "body".to_string()),
        ),
        _ => (
            format!("Request body could not be read: {detail}"),
            "body".to_string(),
        ),
    };

    AppError::Validation {
        message,
        field: Some(field),
        received: None,
        docs_hint: Some(BODY_DOCS_HINT.to_string()),
        violations: Vec::new(),
    }
}

/// Best-effort name of the offending field in a serde data error.
///
/// Understands serde's missing/unknown field messages and the `path: error`
/// prefix axum adds for type mismatches.
fn rejected_field(detail: &str) -> Option<String> {
    for marker in ["missing field `", "unknown field `"] {
        if let Some((_, rest)) = detail.split_once(marker) {
            return rest.split_once('`').map(|(name, _)| name.to_string());
        }
    }
    let (_, rest) = detail.split_once("target type: ")?;
    let (path, _) = rest.split_once(": ")?;
    (!path.is_empty() && path != "." && !path.contains(' ')).then(|| path.to_string())
}
