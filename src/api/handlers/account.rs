//! Balance reads and admin collateral administration.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Extension;
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::api::wire_body::{no_content, ok, Wire};
use crate::auth::AuthUser;
use crate::config::ADMIN_TOKEN;
use crate::errors::ExchangeError;
use crate::wire::Message;
use crate::AppState;

/// `GET /balance` (auth) → `{balance, potential_balance, collateral}`.
pub async fn balance(State(state): State<Arc<AppState>>, Extension(auth): Extension<AuthUser>) -> Response {
    let (balance, potential, collateral) = state.engine.balance_info(&auth.username);
    ok(Message::new().set("balance", balance).set("potential_balance", potential).set("collateral", collateral))
}

/// `PUT /collateral/{user}` — `{collateral}`, admin bearer `"password123"` → 204.
///
/// Not gated by the normal token-resolving `auth_middleware`: the admin
/// bearer is a literal constant, not a username-bound session token.
pub async fn set_collateral(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Path(username): Path<String>,
    Wire(body): Wire,
) -> Result<Response, ExchangeError> {
    if bearer.map(|b| b.token().to_string()).as_deref() != Some(ADMIN_TOKEN) {
        return Err(ExchangeError::Unauthorized("admin token required".into()));
    }

    let collateral = body.get_i64("collateral").ok_or_else(|| ExchangeError::BadRequest("missing field: collateral".into()))?;
    state.engine.set_collateral(&username, collateral);
    Ok(no_content())
}
