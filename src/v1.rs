//! Legacy V1 orders: a parallel, sell-only, flat order list kept around
//! alongside the V2 matching path for backward compatibility.
//!
//! V1 shares only the trade log and the ledger with V2; it has no
//! admission pipeline, no collateral check, no self-match prevention, and
//! is not durable across restart.

use uuid::Uuid;

use crate::matching::EngineState;
use crate::models::V1Order;

/// Admits a V1 sell order unconditionally (no validation pipeline beyond
/// a positive quantity, matching the source's lack of admission gates for
/// this path).
pub fn submit_v1_order(state: &mut EngineState, owner: &str, delivery_start: i64, delivery_end: i64, price: i64, quantity: i64) -> Uuid {
    let order_id = Uuid::new_v4();
    state.v1_orders.push(V1Order {
        order_id,
        owner: owner.to_string(),
        delivery_start,
        delivery_end,
        price,
        quantity,
        active: true,
    });
    order_id
}

/// Lists V1 orders, optionally filtered by `delivery_start` (the only
/// filter the source's `_get_orders` supports).
pub fn list_v1_orders(state: &EngineState, delivery_start: Option<i64>) -> Vec<V1Order> {
    state
        .v1_orders
        .iter()
        .filter(|o| delivery_start.map(|ds| o.delivery_start == ds).unwrap_or(true))
        .cloned()
        .collect()
}
