use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::AllocationError;
use thiserror::Error;
use tracing::{error, warn};

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("short key not found")]
    NotFound,
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Allocation(AllocationError),
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl From<AllocationError> for AppError {
    fn from(error: AllocationError) -> Self {
        match error {
            AllocationError::NotFound(_) => AppError::NotFound,
            other => AppError::Allocation(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Allocation(error) => match error {
                AllocationError::NotFound(_) => StatusCode::NOT_FOUND,
                AllocationError::Exhausted { .. } | AllocationError::Cancelled => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                AllocationError::Store(store) if store.is_unavailable() => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                AllocationError::Store(_) | AllocationError::InvalidSettings(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(message) => message.clone(),
            AppError::NotFound => self.to_string(),
            AppError::Timeout => "service busy, try again later".to_string(),
            AppError::Allocation(AllocationError::Exhausted { .. }) => {
                "service busy, try again later".to_string()
            }
            AppError::Allocation(AllocationError::Cancelled) => {
                "service is shutting down".to_string()
            }
            AppError::Allocation(_) | AppError::Panic(_) => {
                "failed to process request".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            match &self {
                AppError::Allocation(AllocationError::Exhausted { .. })
                | AppError::Allocation(AllocationError::Cancelled)
                | AppError::Timeout => warn!(error = %self, "request not served"),
                _ => error!(error = %self, "request failed"),
            }
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
