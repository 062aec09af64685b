//! Request/response plumbing for the GalacticBuf envelope at the HTTP
//! boundary: all request/response bodies use the binary envelope.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::async_trait;

use crate::errors::ExchangeError;
use crate::wire::{decode_message, encode_message, Message};

/// Extracts and decodes a request body as a GalacticBuf `Message`.
pub struct Wire(pub Message);

#[async_trait]
impl<S> FromRequest<S> for Wire
where
    S: Send + Sync,
{
    type Rejection = ExchangeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ExchangeError::BadRequest("could not read request body".into()))?;
        let msg = decode_message(&bytes).map_err(|e| ExchangeError::BadRequest(format!("malformed request body: {e}")))?;
        Ok(Wire(msg))
    }
}

/// Encodes `msg` as a GalacticBuf response with `status`.
pub fn wire_response(status: StatusCode, msg: Message) -> Response {
    match encode_message(&msg) {
        Ok(bytes) => (status, [("content-type", "application/x-galacticbuf")], bytes).into_response(),
        Err(e) => {
            tracing::error!(%e, "failed to encode response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn ok(msg: Message) -> Response {
    wire_response(StatusCode::OK, msg)
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
