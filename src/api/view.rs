//! Wire-body conversions from domain types.

use std::collections::BTreeMap;

use crate::models::{ExecutionType, Order, OrderStatus, Side, Trade, V1Order};
use crate::wire::{object, Value};

pub fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

fn parse_side(s: &str) -> Option<Side> {
    match s {
        "buy" => Some(Side::Buy),
        "sell" => Some(Side::Sell),
        _ => None,
    }
}

pub fn parse_side_field(s: &str) -> Result<Side, crate::errors::ExchangeError> {
    parse_side(s).ok_or_else(|| crate::errors::ExchangeError::BadRequest(format!("invalid side: {s}")))
}

fn status_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Active => "ACTIVE",
        OrderStatus::Filled => "FILLED",
        OrderStatus::Cancelled => "CANCELLED",
    }
}

fn execution_type_str(et: ExecutionType) -> &'static str {
    match et {
        ExecutionType::Gtc => "GTC",
        ExecutionType::Ioc => "IOC",
        ExecutionType::Fok => "FOK",
    }
}

pub fn parse_execution_type(s: &str) -> Result<ExecutionType, crate::errors::ExchangeError> {
    match s {
        "GTC" => Ok(ExecutionType::Gtc),
        "IOC" => Ok(ExecutionType::Ioc),
        "FOK" => Ok(ExecutionType::Fok),
        other => Err(crate::errors::ExchangeError::BadRequest(format!("unknown execution type: {other}"))),
    }
}

pub fn order_to_value(o: &Order) -> Value {
    object(BTreeMap::from([
        ("order_id", Value::Str(o.order_id.to_string())),
        ("owner", Value::Str(o.owner.clone())),
        ("side", Value::Str(side_str(o.side).to_string())),
        ("price", Value::Int(o.price)),
        ("quantity", Value::Int(o.quantity)),
        ("original_quantity", Value::Int(o.original_quantity)),
        ("filled_quantity", Value::Int(o.filled_quantity())),
        ("status", Value::Str(status_str(o.status).to_string())),
        ("created_at", Value::Int(o.created_at)),
        ("execution_type", Value::Str(execution_type_str(o.execution_type).to_string())),
        ("delivery_start", Value::Int(o.contract.delivery_start)),
        ("delivery_end", Value::Int(o.contract.delivery_end)),
    ]))
}

pub fn v1_order_to_value(o: &V1Order) -> Value {
    object(BTreeMap::from([
        ("order_id", Value::Str(o.order_id.to_string())),
        ("owner", Value::Str(o.owner.clone())),
        ("delivery_start", Value::Int(o.delivery_start)),
        ("delivery_end", Value::Int(o.delivery_end)),
        ("price", Value::Int(o.price)),
        ("quantity", Value::Int(o.quantity)),
        ("active", Value::Str(o.active.to_string())),
    ]))
}

pub fn trade_to_value(t: &Trade) -> Value {
    object(BTreeMap::from([
        ("trade_id", Value::Str(t.trade_id.to_string())),
        ("buyer_id", Value::Str(t.buyer_id.clone())),
        ("seller_id", Value::Str(t.seller_id.clone())),
        ("price", Value::Int(t.price)),
        ("quantity", Value::Int(t.quantity)),
        ("timestamp", Value::Int(t.timestamp)),
        ("delivery_start", Value::Int(t.delivery_start)),
        ("delivery_end", Value::Int(t.delivery_end)),
    ]))
}

/// Annotated with `side`/`role` for the caller's perspective.
pub fn my_trade_to_value(t: &Trade, username: &str) -> Option<Value> {
    let (side, counterparty) = t.role_of(username)?;
    Some(object(BTreeMap::from([
        ("trade_id", Value::Str(t.trade_id.to_string())),
        ("side", Value::Str(side_str(side).to_string())),
        ("counterparty", Value::Str(counterparty.to_string())),
        ("price", Value::Int(t.price)),
        ("quantity", Value::Int(t.quantity)),
        ("timestamp", Value::Int(t.timestamp)),
        ("delivery_start", Value::Int(t.delivery_start)),
        ("delivery_end", Value::Int(t.delivery_end)),
    ])))
}

pub fn match_outcome_fields(order_id: uuid::Uuid, status: OrderStatus, filled_quantity: i64) -> crate::wire::Message {
    crate::wire::Message::new()
        .set("order_id", order_id.to_string())
        .set("status", status_str(status))
        .set("filled_quantity", filled_quantity)
}

/// `{type, order_id, status?}` for one bulk-operations result.
pub fn bulk_result_to_value(r: &crate::bulk::BulkOpResult) -> Value {
    let mut fields = BTreeMap::from([("type", Value::Str(r.op_type.to_string()))]);
    if let Some(id) = r.order_id {
        fields.insert("order_id", Value::Str(id.to_string()));
    }
    if let Some(status) = r.status {
        fields.insert("status", Value::Str(status_str(status).to_string()));
    }
    object(fields)
}
