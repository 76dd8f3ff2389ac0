use axum::http::StatusCode;
use thiserror::Error;

use chainwatch_core::WatchError;

use crate::response::{FailureDetail, FieldViolation};

/// Non-standard "client closed request" status.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("field: [{field}] description: [{description}]")]
    Validation { field: String, description: String },

    /// A store call reported [`WatchError::Cancelled`]. The bundled stores
    /// never do, and a client that disconnects mid-request is not seen here
    /// because axum drops the handler future without writing a response.
    /// Only a custom store that observes its own cancellation reaches 499.
    #[error("request was canceled")]
    Canceled,

    #[error(transparent)]
    Internal(WatchError),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            description: description.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Canceled => {
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Envelope `code` field.
    pub fn code(&self) -> u32 {
        match self {
            Self::Validation { .. } => 4000,
            Self::Canceled => 4990,
            Self::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "bad request",
            Self::Canceled => "request was canceled",
            Self::Internal(_) => "internal server error",
        }
    }

    pub fn details(&self) -> Vec<FailureDetail> {
        match self {
            Self::Validation { field, description } => vec![FailureDetail {
                field_violations: vec![FieldViolation {
                    field: field.clone(),
                    description: description.clone(),
                }],
            }],
            _ => vec![],
        }
    }
}

impl From<WatchError> for ApiError {
    fn from(e: WatchError) -> Self {
        if e.is_cancelled() {
            Self::Canceled
        } else {
            Self::Internal(e)
        }
    }
}
