//! `POST /v2/bulk-operations`.
//!
//! The GalacticBuf object decoder only carries scalar (int/string/bytes)
//! fields per object, and never nests a list or another object inside
//! one. A literal `{contracts: [{operations: [...]}]}` body would need
//! two levels of object nesting with a list at the inner level, which
//! that shape cannot express. This endpoint accepts an equivalent
//! flattened shape instead: a single top-level `operations` list whose
//! objects each carry their own `delivery_start`/`delivery_end` alongside
//! the op fields. Flattening preserves the one thing atomicity depends
//! on — input order — since each operation becomes its own
//! single-operation `BulkContractBatch` and `execute_bulk` replays
//! batches strictly in sequence.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;

use crate::api::view::bulk_result_to_value;
use crate::api::wire_body::{ok, Wire};
use crate::bulk::{BulkContractBatch, BulkOp};
use crate::errors::ExchangeError;
use crate::models::{Contract, ExecutionType};
use crate::wire::{Message, Value};
use crate::AppState;

fn require_str<'a>(msg: &'a Message, name: &'static str) -> Result<&'a str, ExchangeError> {
    msg.get_str(name).ok_or_else(|| ExchangeError::BadRequest(format!("missing field: {name}")))
}

fn require_i64(msg: &Message, name: &'static str) -> Result<i64, ExchangeError> {
    msg.get_i64(name).ok_or_else(|| ExchangeError::BadRequest(format!("missing field: {name}")))
}

fn parse_one_op(op: &Message) -> Result<(Contract, BulkOp), ExchangeError> {
    let delivery_start = require_i64(op, "delivery_start")?;
    let delivery_end = require_i64(op, "delivery_end")?;
    let contract = Contract::new(delivery_start, delivery_end);
    let participant_token = require_str(op, "participant_token")?.to_string();

    let parsed = match require_str(op, "type")? {
        "create" => {
            let side = crate::api::view::parse_side_field(require_str(op, "side")?)?;
            let price = require_i64(op, "price")?;
            let quantity = require_i64(op, "quantity")?;
            let execution_type = match op.get_str("execution_type") {
                Some(s) => crate::api::view::parse_execution_type(s)?,
                None => ExecutionType::default(),
            };
            BulkOp::Create {
                participant_token,
                side,
                price,
                quantity,
                execution_type,
            }
        }
        "modify" => {
            let order_id = parse_order_id(op)?;
            let price = require_i64(op, "price")?;
            let quantity = require_i64(op, "quantity")?;
            BulkOp::Modify {
                participant_token,
                order_id,
                price,
                quantity,
            }
        }
        "cancel" => {
            let order_id = parse_order_id(op)?;
            BulkOp::Cancel { participant_token, order_id }
        }
        other => return Err(ExchangeError::BadRequest(format!("unknown bulk op type: {other}"))),
    };

    Ok((contract, parsed))
}

fn parse_order_id(op: &Message) -> Result<uuid::Uuid, ExchangeError> {
    let raw = require_str(op, "order_id")?;
    uuid::Uuid::parse_str(raw).map_err(|_| ExchangeError::BadRequest("invalid order_id".into()))
}

/// `POST /v2/bulk-operations` → 200 with a per-op `{type, order_id, status?}`
/// array in request order.
pub async fn bulk_operations(State(state): State<Arc<AppState>>, Wire(body): Wire) -> Result<Response, ExchangeError> {
    let ops = body.get_list("operations").ok_or_else(|| ExchangeError::BadRequest("missing field: operations".into()))?;

    let mut batches = Vec::with_capacity(ops.len());
    for op_value in ops {
        let op = op_value.as_object().ok_or_else(|| ExchangeError::BadRequest("operations must be objects".into()))?;
        let (contract, op) = parse_one_op(op)?;
        batches.push(BulkContractBatch { contract, operations: vec![op] });
    }

    let results = state.engine.bulk_operations(batches)?;
    Ok(ok(Message::new().set("results", Value::List(results.iter().map(bulk_result_to_value).collect()))))
}
