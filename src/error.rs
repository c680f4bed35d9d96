use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("{0}")]
    Api(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Faculty not assigned for subjects: {}", .missing.join(", "))]
    IncompleteAssignment { missing: Vec<String> },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Not logged in")]
    Unauthorized,

    #[error("Role {0} is not allowed here")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to {action}")]
    Upstream {
        action: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wraps a backend failure into the generic message shown to users.
    pub fn upstream(action: impl Into<String>, source: AppError) -> Self {
        let action = action.into();
        error!("failed to {}: {}", action, source);
        AppError::Upstream {
            action,
            source: Box::new(source),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidDate(_) | AppError::IncompleteAssignment { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, message),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, message),
            AppError::Upstream { source, .. } => {
                let status = match source.as_ref() {
                    AppError::Status(401) => StatusCode::UNAUTHORIZED,
                    AppError::Status(404) | AppError::NotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, message)
            }
            AppError::Http(_) | AppError::Status(_) | AppError::Api(_) | AppError::Decode(_) => {
                error!("backend error: {}", message);
                (StatusCode::BAD_GATEWAY, "Backend request failed".to_string())
            }
            AppError::Config(_) => {
                error!("configuration error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
