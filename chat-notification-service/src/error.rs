//! Caller-facing errors of the callable function.
//!
//! Two kinds only: the request was malformed, or the delivery service failed.
//! Both serialize into the callable error envelope
//! `{"error": {"code", "status", "message"}}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::MISSING_FIELDS_MESSAGE;
use crate::services::ProviderError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("There was an error: {0}")]
    DeliveryError(String),
}

impl DispatchError {
    /// Code exposed to callers.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::InvalidArgument(_) => "invalid-argument",
            DispatchError::DeliveryError(_) => "UNKNOWN",
        }
    }

    /// Canonical status name used on the wire.
    pub fn status(&self) -> &'static str {
        match self {
            DispatchError::InvalidArgument(_) => "INVALID_ARGUMENT",
            DispatchError::DeliveryError(_) => "UNKNOWN",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            DispatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DispatchError::DeliveryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProviderError> for DispatchError {
    fn from(err: ProviderError) -> Self {
        DispatchError::DeliveryError(err.to_string())
    }
}

impl From<JsonRejection> for DispatchError {
    fn from(rejection: JsonRejection) -> Self {
        DispatchError::InvalidArgument(format!(
            "{} ({})",
            MISSING_FIELDS_MESSAGE,
            rejection.body_text()
        ))
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    status: &'static str,
    message: String,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                status: self.status(),
                message: self.to_string(),
            },
        };

        (status, Json(envelope)).into_response()
    }
}
