//! Legacy V1 order endpoints (`POST /orders`, `GET /orders`) — a flat,
//! sell-only order list with no admission pipeline.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Extension;
use serde::Deserialize;

use crate::api::view::v1_order_to_value;
use crate::api::wire_body::ok;
use crate::auth::AuthUser;
use crate::errors::ExchangeError;
use crate::wire::{Message, Value};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct V1ListQuery {
    pub delivery_start: Option<i64>,
}

/// `POST /orders` — `{delivery_start, delivery_end, price, quantity}` → 200 `{order_id}`.
pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    crate::api::wire_body::Wire(body): crate::api::wire_body::Wire,
) -> Result<Response, ExchangeError> {
    let delivery_start = body.get_i64("delivery_start").ok_or_else(|| ExchangeError::BadRequest("missing field: delivery_start".into()))?;
    let delivery_end = body.get_i64("delivery_end").ok_or_else(|| ExchangeError::BadRequest("missing field: delivery_end".into()))?;
    let price = body.get_i64("price").ok_or_else(|| ExchangeError::BadRequest("missing field: price".into()))?;
    let quantity = body.get_i64("quantity").ok_or_else(|| ExchangeError::BadRequest("missing field: quantity".into()))?;
    if quantity <= 0 {
        return Err(ExchangeError::BadRequest("quantity must be positive".into()));
    }

    let order_id = state.engine.submit_v1_order(&auth.username, delivery_start, delivery_end, price, quantity);
    Ok(ok(Message::new().set("order_id", order_id.to_string())))
}

/// `GET /orders?delivery_start=` → 200 `{orders: [...]}`.
pub async fn list_orders(State(state): State<Arc<AppState>>, Query(q): Query<V1ListQuery>) -> Response {
    let orders = state.engine.list_v1_orders(q.delivery_start);
    ok(Message::new().set("orders", Value::List(orders.iter().map(v1_order_to_value).collect())))
}
