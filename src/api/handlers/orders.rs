//! V2 order submission, modification, cancellation, and book/trade reads.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Extension;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::view::{self, match_outcome_fields, my_trade_to_value, order_to_value, trade_to_value};
use crate::api::wire_body::{no_content, ok, Wire};
use crate::auth::AuthUser;
use crate::errors::ExchangeError;
use crate::models::Contract;
use crate::wire::{Message, Value};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    pub delivery_start: i64,
    pub delivery_end: i64,
}

impl ContractQuery {
    fn contract(&self) -> Contract {
        Contract::new(self.delivery_start, self.delivery_end)
    }
}

/// `POST /v2/orders` — `{side, price, quantity, delivery_start, delivery_end, execution_type?}`
/// → 200 `{order_id, status, filled_quantity}`.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Wire(body): Wire,
) -> Result<Response, ExchangeError> {
    let side = view::parse_side_field(body.get_str("side").ok_or_else(|| ExchangeError::BadRequest("missing field: side".into()))?)?;
    let price = body.get_i64("price").ok_or_else(|| ExchangeError::BadRequest("missing field: price".into()))?;
    let quantity = body.get_i64("quantity").ok_or_else(|| ExchangeError::BadRequest("missing field: quantity".into()))?;
    let delivery_start = body.get_i64("delivery_start").ok_or_else(|| ExchangeError::BadRequest("missing field: delivery_start".into()))?;
    let delivery_end = body.get_i64("delivery_end").ok_or_else(|| ExchangeError::BadRequest("missing field: delivery_end".into()))?;
    let execution_type = match body.get_str("execution_type") {
        Some(s) => view::parse_execution_type(s)?,
        None => Default::default(),
    };
    let contract = Contract::new(delivery_start, delivery_end);

    let outcome = state.engine.submit_order(&auth.username, contract, side, price, quantity, execution_type)?;
    Ok(ok(match_outcome_fields(outcome.order_id, outcome.status, outcome.filled_quantity)))
}

/// `PUT /v2/orders/{id}` — `{price, quantity}` → 200 `{order_id, status, filled_quantity}`.
pub async fn modify_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Wire(body): Wire,
) -> Result<Response, ExchangeError> {
    let price = body.get_i64("price").ok_or_else(|| ExchangeError::BadRequest("missing field: price".into()))?;
    let quantity = body.get_i64("quantity").ok_or_else(|| ExchangeError::BadRequest("missing field: quantity".into()))?;

    let outcome = state.engine.modify_order(&auth.username, order_id, price, quantity)?;
    Ok(ok(match_outcome_fields(outcome.order_id, outcome.status, outcome.filled_quantity)))
}

/// `DELETE /v2/orders/{id}` → 204.
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ExchangeError> {
    state.engine.cancel_order(&auth.username, order_id)?;
    Ok(no_content())
}

/// `GET /v2/orders?delivery_start=&delivery_end=` → 200 `{bids: [...], asks: [...]}`.
pub async fn list_orders(State(state): State<Arc<AppState>>, Query(q): Query<ContractQuery>) -> Response {
    let (bids, asks) = state.engine.book_snapshot(q.contract());
    ok(Message::new()
        .set("bids", Value::List(bids.iter().map(order_to_value).collect()))
        .set("asks", Value::List(asks.iter().map(order_to_value).collect())))
}

/// `GET /v2/my-orders` (auth) → owner's ACTIVE orders, newest-created first.
pub async fn my_orders(State(state): State<Arc<AppState>>, Extension(auth): Extension<AuthUser>) -> Response {
    let orders = state.engine.my_orders(&auth.username);
    ok(Message::new().set("orders", Value::List(orders.iter().map(order_to_value).collect())))
}

/// `GET /v2/my-trades?delivery_start=&delivery_end=` (auth) → annotated trades.
pub async fn my_trades(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(q): Query<ContractQuery>,
) -> Response {
    let trades = state.engine.my_trades(&auth.username, q.contract());
    let annotated: Vec<Value> = trades.iter().filter_map(|t| my_trade_to_value(t, &auth.username)).collect();
    ok(Message::new().set("trades", Value::List(annotated)))
}

/// `GET /v2/trades?delivery_start=&delivery_end=` → V2-only trades, newest first.
pub async fn v2_trades(State(state): State<Arc<AppState>>, Query(q): Query<ContractQuery>) -> Response {
    let trades = state.engine.v2_trades(q.contract());
    ok(Message::new().set("trades", Value::List(trades.iter().map(trade_to_value).collect())))
}
