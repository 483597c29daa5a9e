use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::order::{OrderEventKind, OrderStatus};

#[derive(Debug, Error, PartialEq)]
pub enum AppError {
    #[error("event {event} is not allowed while order is {status}")]
    InvalidTransition {
        status: OrderStatus,
        event: OrderEventKind,
    },

    #[error("supplied code does not match the {slot} code")]
    CodeMismatch { slot: &'static str },

    #[error("order changed concurrently: expected {expected}, found {found}")]
    ConcurrentModification {
        expected: OrderStatus,
        found: OrderStatus,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("settlement already in progress for courier {0}")]
    SettlementInProgress(uuid::Uuid),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no couriers available")]
    NoAvailableCouriers,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::CodeMismatch { .. } => "code_mismatch",
            AppError::ConcurrentModification { .. } => "concurrent_modification",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::SettlementInProgress(_) => "settlement_in_progress",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::NoAvailableCouriers => "no_available_couriers",
            AppError::Internal(_) => "internal",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::CodeMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ConcurrentModification { .. } => StatusCode::CONFLICT,
            AppError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            AppError::SettlementInProgress(_) => StatusCode::LOCKED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NoAvailableCouriers => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.kind(),
        }));

        (status, body).into_response()
    }
}
