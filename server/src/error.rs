use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use wallmask_shared::{ErrorBody, ValidationErrors};

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {}", .0.summary())]
    Validation(ValidationErrors),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("not found")]
    NotFound,
    #[error("too many requests")]
    RateLimited,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => {
                log::debug!("Rejected request: {}", errors.summary());
                (StatusCode::BAD_REQUEST, ErrorBody::Validation { error: errors })
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::Message {
                    error: message.to_string(),
                },
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody::Message {
                    error: "Not found".to_string(),
                },
            ),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody::Message {
                    error: "Too many requests".to_string(),
                },
            ),
            ApiError::Storage(error) => {
                log::error!("Storage failure: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::Message {
                        error: "Internal Server Error".to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
