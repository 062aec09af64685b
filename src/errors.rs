//! Crate-wide error taxonomy and its mapping onto the HTTP boundary.
//!
//! `ExchangeError` is what every engine/admission/matching function
//! returns internally; `into_response` encodes it as a GalacticBuf
//! envelope the same shape a success body would use, so clients parse
//! errors with the same decoder.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::wire::{encode_message, Message};

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("insufficient collateral")]
    InsufficientCollateral,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("self-match would occur")]
    SelfMatch,
    #[error("too early: trading window has not opened")]
    TooEarly,
    #[error("too late: trading window has closed")]
    TooLate,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExchangeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ExchangeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ExchangeError::InsufficientCollateral => StatusCode::PAYMENT_REQUIRED,
            ExchangeError::Forbidden(_) => StatusCode::FORBIDDEN,
            ExchangeError::NotFound(_) => StatusCode::NOT_FOUND,
            ExchangeError::Conflict(_) => StatusCode::CONFLICT,
            ExchangeError::SelfMatch => StatusCode::PRECONDITION_FAILED,
            ExchangeError::TooEarly => StatusCode::from_u16(425).unwrap(),
            ExchangeError::TooLate => StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS,
            ExchangeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ExchangeError::BadRequest(_) => "BAD_REQUEST",
            ExchangeError::Unauthorized(_) => "UNAUTHORIZED",
            ExchangeError::InsufficientCollateral => "INSUFFICIENT_COLLATERAL",
            ExchangeError::Forbidden(_) => "FORBIDDEN",
            ExchangeError::NotFound(_) => "NOT_FOUND",
            ExchangeError::Conflict(_) => "CONFLICT",
            ExchangeError::SelfMatch => "PRECONDITION_FAILED",
            ExchangeError::TooEarly => "TOO_EARLY",
            ExchangeError::TooLate => "TOO_LATE",
            ExchangeError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(code = self.code(), error = %self, "request failed");

        let body = Message::new().set("error", self.code()).set("message", self.to_string());
        match encode_message(&body) {
            Ok(bytes) => (
                status,
                [("content-type", "application/x-galacticbuf")],
                bytes,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(%e, "failed to encode error body");
                status.into_response()
            }
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
