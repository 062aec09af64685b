//! Registration, login, password change, and DNA authentication endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;

use crate::api::wire_body::{no_content, ok, Wire};
use crate::errors::ExchangeError;
use crate::wire::Message;
use crate::AppState;

fn require_field<'a>(msg: &'a Message, name: &'static str) -> Result<&'a str, ExchangeError> {
    msg.get_str(name).ok_or_else(|| ExchangeError::BadRequest(format!("missing field: {name}")))
}

/// `POST /register` — `{username, password}` → 204.
pub async fn register(State(state): State<Arc<AppState>>, Wire(body): Wire) -> Result<Response, ExchangeError> {
    let username = require_field(&body, "username")?;
    let password = require_field(&body, "password")?;
    state.engine.register(username, password)?;
    Ok(no_content())
}

/// `POST /login` — `{username, password}` → 200 `{token}`.
pub async fn login(State(state): State<Arc<AppState>>, Wire(body): Wire) -> Result<Response, ExchangeError> {
    let username = require_field(&body, "username")?;
    let password = require_field(&body, "password")?;
    let token = state.engine.login(username, password)?;
    Ok(ok(Message::new().set("token", token)))
}

/// `PUT /user/password` — `{username, old_password, new_password}` → 204.
pub async fn change_password(State(state): State<Arc<AppState>>, Wire(body): Wire) -> Result<Response, ExchangeError> {
    let username = require_field(&body, "username")?;
    let old_password = require_field(&body, "old_password")?;
    let new_password = require_field(&body, "new_password")?;
    state.engine.change_password(username, old_password, new_password)?;
    Ok(no_content())
}

/// `POST /dna-submit` — `{username, password, dna_sample}` → 204.
pub async fn dna_submit(State(state): State<Arc<AppState>>, Wire(body): Wire) -> Result<Response, ExchangeError> {
    let username = require_field(&body, "username")?;
    let password = require_field(&body, "password")?;
    let sample = require_field(&body, "dna_sample")?;
    state.engine.submit_dna(username, password, sample)?;
    Ok(no_content())
}

/// `POST /dna-login` — `{username, dna_sample}` → 200 `{token}`.
pub async fn dna_login(State(state): State<Arc<AppState>>, Wire(body): Wire) -> Result<Response, ExchangeError> {
    let username = require_field(&body, "username")?;
    let sample = require_field(&body, "dna_sample")?;
    let token = state.engine.dna_login(username, sample)?;
    Ok(ok(Message::new().set("token", token)))
}
