//! Response envelopes shared by every endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::server::RequestId;

/// `{code: 0, message: "successfully", data, requestId}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Success<T> {
    pub code: u32,
    pub message: &'static str,
    pub data: T,
    pub request_id: String,
}

/// `{code, message, details, requestId}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub code: u32,
    pub message: &'static str,
    pub details: Vec<FailureDetail>,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetail {
    pub field_violations: Vec<FieldViolation>,
}

#[derive(Debug, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

pub fn respond_success<T: Serialize>(request_id: &RequestId, data: T) -> Response {
    let body = Success {
        code: 0,
        message: "successfully",
        data,
        request_id: request_id.to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn respond_failure(request_id: &RequestId, err: ApiError) -> Response {
    match &err {
        ApiError::Validation { .. } => {
            tracing::debug!(request_id = %request_id, error = %err, "request rejected");
        }
        _ => {
            tracing::warn!(request_id = %request_id, error = %err, "respond failure");
        }
    }

    let status = err.status();
    let body = Failure {
        code: err.code(),
        message: err.message(),
        details: err.details(),
        request_id: request_id.to_string(),
    };
    (status, Json(body)).into_response()
}
