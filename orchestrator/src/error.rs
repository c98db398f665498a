//! HTTP error mapping (spec.md §7): every error kind maps one-to-one onto
//! an HTTP status code. Grounded on `graph_rag/src/errors.rs::GraphError`'s
//! `ResponseError` impl.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use conhub_models::error::ErrorKind;
use conhub_ports::PortError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }
}

impl From<PortError> for ApiError {
    fn from(e: PortError) -> Self {
        Self::new(e.kind, e.message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error_kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error_kind: self.kind.as_str(),
            message: self.message.clone(),
            details: self.details.clone(),
        })
    }
}
