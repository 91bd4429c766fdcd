use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use anvaya_core::error::{self, ApiError};
use anvaya_core::validation::{ValidationErrors, Violation};

use crate::store::StoreError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
        violations: Vec<Violation>,
    },
    /// Referenced entity does not exist (404)
    NotFound { resource: String, id: String },
    /// Unique value already taken (409)
    Conflict {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
    },
    /// Persistence failure (500)
    Store(StoreError),
}

impl AppError {
    /// 404 for a lead id that does not resolve.
    pub fn lead_not_found(id: impl ToString) -> Self {
        AppError::NotFound {
            resource: "Lead".to_string(),
            id: id.to_string(),
        }
    }

    /// 404 for an agent id that does not resolve.
    pub fn agent_not_found(id: impl ToString) -> Self {
        AppError::NotFound {
            resource: "Sales agent".to_string(),
            id: id.to_string(),
        }
    }
}

fn internal_error(request_id: String) -> (StatusCode, ApiError) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ApiError {
            error: error::codes::INTERNAL_ERROR.to_string(),
            message: "An internal error occurred".to_string(),
            field: None,
            received: None,
            violations: Vec::new(),
            request_id,
            docs_hint: None,
        },
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
                violations,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    violations,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} with ID '{id}' not found."),
                    field: None,
                    received: Some(serde_json::Value::String(id)),
                    violations: Vec::new(),
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Conflict {
                message,
                field,
                received,
            } => (
                StatusCode::CONFLICT,
                ApiError {
                    error: error::codes::CONFLICT.to_string(),
                    message,
                    field,
                    received,
                    violations: Vec::new(),
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Store(StoreError::Duplicate { constraint }) => {
                tracing::warn!(constraint = %constraint, "Unhandled unique violation");
                (
                    StatusCode::CONFLICT,
                    ApiError {
                        error: error::codes::CONFLICT.to_string(),
                        message: "A record with the same unique value already exists.".to_string(),
                        field: None,
                        received: None,
                        violations: Vec::new(),
                        request_id,
                        docs_hint: None,
                    },
                )
            }
            AppError::Store(err) => {
                tracing::error!(request_id = %request_id, "Store error: {:?}", err);
                internal_error(request_id)
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors.message();
        let (field, received) = errors
            .first()
            .map(|v| (Some(v.field.clone()), v.received.clone()))
            .unwrap_or((None, None));
        AppError::Validation {
            message,
            field,
            received,
            docs_hint: None,
            violations: errors.into_violations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvaya_core::validation::Validator;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[tokio::test]
    async fn validation_errors_list_every_violation() {
        let mut v = Validator::new();
        v.required_str("name", None);
        v.email("email", Some("nope"));
        let err = AppError::from(v.into_errors());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["message"], "Invalid input: 'name' is required.");
        assert_eq!(body["field"], "name");
        assert_eq!(body["violations"].as_array().map(Vec::len), Some(2));
        assert!(body["requestId"].is_string());
    }

    #[tokio::test]
    async fn not_found_names_the_resource() {
        let response = AppError::lead_not_found("6650f1c2a4b8e93d7c1f0a12").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Lead with ID '6650f1c2a4b8e93d7c1f0a12' not found."
        );
    }

    #[tokio::test]
    async fn store_errors_do_not_leak_detail() {
        let err = AppError::from(StoreError::Corrupt("leads.status has unknown value 'Lost'".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("violations").is_none());
    }
}
