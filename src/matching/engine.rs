//! Matching engine: walks the opposite book for an admitted order,
//! producing trades and a residual under the active execution type.
//!
//! Every mutating entry point here takes `&mut EngineState` and an
//! `Option<&EventBus>` — `None` during bulk-transaction simulation (no
//! events escape a shadow run), `Some` for every real, committed
//! operation. This lets the singleton and bulk code paths share one
//! implementation instead of diverging: the atomicity of a bulk commit
//! depends on simulate and commit running *the same* logic.

use uuid::Uuid;

use super::admission;
use super::EngineState;
use crate::errors::ExchangeError;
use crate::events::{BookDeltaKind, EventBus};
use crate::models::{Contract, ExecutionType, Order, OrderStatus, Side, Trade, TradeSource};

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub order_id: Uuid,
    pub status: OrderStatus,
    /// Quantity filled as a direct result of this call (not the order's
    /// lifetime total — that lives in `original_quantity - quantity` on
    /// the stored `Order`).
    pub filled_quantity: i64,
}

fn crosses(incoming_side: Side, incoming_price: i64, resting_price: i64) -> bool {
    match incoming_side {
        Side::Buy => resting_price <= incoming_price,
        Side::Sell => resting_price >= incoming_price,
    }
}

/// Runs the core matching loop for a freshly-admitted taker order and
/// applies the active execution type to whatever remains. Admission gates
/// must already have passed before this is called. `original_quantity` is
/// the baseline a resting GTC order is stamped with — equal to `quantity`
/// for a brand-new order, but rebased by `modify_order` to preserve
/// lifetime fill history across a price/quantity change.
#[allow(clippy::too_many_arguments)]
fn run_matching(
    state: &mut EngineState,
    events: Option<&EventBus>,
    order_id: Uuid,
    owner: &str,
    contract: Contract,
    side: Side,
    price: i64,
    quantity: i64,
    original_quantity: i64,
    execution_type: ExecutionType,
    now: i64,
) -> MatchOutcome {
    let opp_side = side.opposite();
    let mut remaining = quantity;

    if execution_type == ExecutionType::Fok {
        let crossable = state.book.crossable_quantity(&contract, opp_side, side, price);
        if crossable < quantity {
            return MatchOutcome {
                order_id,
                status: OrderStatus::Cancelled,
                filled_quantity: 0,
            };
        }
    }

    while remaining > 0 {
        let Some(top) = state.book.peek_top(&contract, opp_side).cloned() else {
            break;
        };
        if !crosses(side, price, top.price) {
            break;
        }

        let fill_qty = remaining.min(top.quantity);
        let (buyer_id, seller_id) = match side {
            Side::Buy => (owner.to_string(), top.owner.clone()),
            Side::Sell => (top.owner.clone(), owner.to_string()),
        };
        let trade = Trade {
            trade_id: Uuid::new_v4(),
            buyer_id,
            seller_id,
            price: top.price,
            quantity: fill_qty,
            timestamp: now,
            delivery_start: contract.delivery_start,
            delivery_end: contract.delivery_end,
            source: TradeSource::V2,
        };

        remaining -= fill_qty;
        state.book.reduce_top(&contract, opp_side, fill_qty);
        state.ledger.apply_trade(trade.clone());
        if let Some(bus) = events {
            bus.publish_trade(&trade);
        }

        if top.quantity - fill_qty == 0 {
            let mut filled = state.book.remove_top(&contract, opp_side).expect("top just matched must exist");
            filled.status = OrderStatus::Filled;
            filled.quantity = 0;
            if let Some(bus) = events {
                bus.publish_book_delta(&contract, BookDeltaKind::Remove, &filled);
                bus.publish_execution_report(&filled);
            }
        } else {
            let updated = state.book.peek_top(&contract, opp_side).cloned().expect("resting order must remain");
            if let Some(bus) = events {
                bus.publish_book_delta(&contract, BookDeltaKind::Modify, &updated);
                bus.publish_execution_report(&updated);
            }
        }
    }

    let filled_quantity = quantity - remaining;

    match execution_type {
        ExecutionType::Gtc => {
            if remaining > 0 {
                let resting = Order {
                    order_id,
                    owner: owner.to_string(),
                    contract,
                    side,
                    price,
                    quantity: remaining,
                    original_quantity,
                    status: OrderStatus::Active,
                    created_at: now,
                    execution_type,
                };
                state.book.insert(resting.clone());
                if let Some(bus) = events {
                    bus.publish_book_delta(&contract, BookDeltaKind::Add, &resting);
                    bus.publish_execution_report(&resting);
                }
                MatchOutcome {
                    order_id,
                    status: OrderStatus::Active,
                    filled_quantity,
                }
            } else {
                MatchOutcome {
                    order_id,
                    status: OrderStatus::Filled,
                    filled_quantity,
                }
            }
        }
        ExecutionType::Ioc | ExecutionType::Fok => MatchOutcome {
            order_id,
            status: if remaining == 0 { OrderStatus::Filled } else { OrderStatus::Cancelled },
            filled_quantity,
        },
    }
}

/// Full admission + matching pipeline for a new V2 order.
#[allow(clippy::too_many_arguments)]
pub fn submit_order(
    state: &mut EngineState,
    events: Option<&EventBus>,
    owner: &str,
    contract: Contract,
    side: Side,
    price: i64,
    quantity: i64,
    execution_type: ExecutionType,
    now: i64,
) -> Result<MatchOutcome, ExchangeError> {
    admission::check_shape(&contract, quantity)?;
    admission::check_trading_window(&contract, now)?;
    admission::check_self_match(&state.book, &contract, side, price, owner)?;

    let signed_commitment = match side {
        Side::Buy => -price * quantity,
        Side::Sell => price * quantity,
    };
    admission::check_collateral(&state.ledger, &state.book, owner, signed_commitment)?;

    let order_id = Uuid::new_v4();
    Ok(run_matching(state, events, order_id, owner, contract, side, price, quantity, quantity, execution_type, now))
}

/// Modify: ownership checked by caller, remove-then-re-admit as a
/// fresh GTC order through the same pipeline. `created_at` resets unless
/// this is a pure quantity decrease; `original_quantity` is rebased so
/// execution-report progress remains consistent across the change.
pub fn modify_order(
    state: &mut EngineState,
    events: Option<&EventBus>,
    owner: &str,
    order_id: Uuid,
    new_price: i64,
    new_quantity: i64,
    now: i64,
) -> Result<MatchOutcome, ExchangeError> {
    if new_quantity <= 0 {
        return Err(ExchangeError::BadRequest("quantity must be positive".into()));
    }

    let existing = state
        .book
        .get(&order_id)
        .cloned()
        .ok_or_else(|| ExchangeError::NotFound("order not found".into()))?;
    if existing.owner != owner {
        return Err(ExchangeError::Forbidden("order not owned by caller".into()));
    }

    let contract = existing.contract;
    let delta_price = new_price - existing.price;
    let delta_qty = new_quantity - existing.quantity;
    let filled_so_far = existing.filled_quantity();

    admission::check_trading_window(&contract, now)?;

    state.book.remove_by_id(&order_id).expect("order looked up above must be removable");

    if let Err(e) = admission::check_self_match(&state.book, &contract, existing.side, new_price, owner) {
        state.book.insert(existing);
        return Err(e);
    }
    let signed_commitment = match existing.side {
        Side::Buy => -new_price * new_quantity,
        Side::Sell => new_price * new_quantity,
    };
    if let Err(e) = admission::check_collateral(&state.ledger, &state.book, owner, signed_commitment) {
        state.book.insert(existing);
        return Err(e);
    }

    if let Some(bus) = events {
        let mut removed = existing.clone();
        removed.status = OrderStatus::Cancelled;
        removed.quantity = 0;
        bus.publish_book_delta(&contract, BookDeltaKind::Remove, &removed);
    }

    let keep_time_priority = delta_price == 0 && delta_qty <= 0;
    let created_at = if keep_time_priority { existing.created_at } else { now };
    let original_quantity = filled_so_far + new_quantity;

    Ok(run_matching(
        state,
        events,
        order_id,
        owner,
        contract,
        existing.side,
        new_price,
        new_quantity,
        original_quantity,
        ExecutionType::Gtc,
        created_at,
    ))
}

/// Cancel: ownership and ACTIVE status checked, terminal transition.
pub fn cancel_order(state: &mut EngineState, events: Option<&EventBus>, owner: &str, order_id: Uuid) -> Result<(), ExchangeError> {
    let existing = state.book.get(&order_id).ok_or_else(|| ExchangeError::NotFound("order not found".into()))?;
    if existing.owner != owner {
        return Err(ExchangeError::Forbidden("order not owned by caller".into()));
    }

    let mut cancelled = state.book.remove_by_id(&order_id).expect("order looked up above must be removable");
    cancelled.status = OrderStatus::Cancelled;
    cancelled.quantity = 0;

    if let Some(bus) = events {
        bus.publish_book_delta(&cancelled.contract, BookDeltaKind::Remove, &cancelled);
        bus.publish_execution_report(&cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Contract;

    fn contract() -> Contract {
        Contract::new(100 * Contract::HOUR_MS, 101 * Contract::HOUR_MS)
    }

    fn now_inside_window(c: &Contract) -> i64 {
        c.delivery_start - 3_600_000
    }

    #[test]
    fn s1_price_time_priority() {
        let mut state = EngineState::default();
        let c = contract();
        let now = now_inside_window(&c);

        let a = submit_order(&mut state, None, "A", c, Side::Sell, 100, 10, ExecutionType::Gtc, now).unwrap();
        let b = submit_order(&mut state, None, "B", c, Side::Sell, 100, 10, ExecutionType::Gtc, now + 1).unwrap();
        assert_eq!(a.status, OrderStatus::Active);
        assert_eq!(b.status, OrderStatus::Active);

        let c_outcome = submit_order(&mut state, None, "C", c, Side::Buy, 100, 15, ExecutionType::Gtc, now + 2).unwrap();
        assert_eq!(c_outcome.status, OrderStatus::Filled);
        assert_eq!(c_outcome.filled_quantity, 15);

        let trades = state.ledger.v2_trades_for_contract(c.delivery_start, c.delivery_end);
        assert_eq!(trades.len(), 2);

        // B remains active with 5 remaining
        let b_order = state.book.get(&b.order_id).unwrap();
        assert_eq!(b_order.quantity, 5);
        assert_eq!(b_order.status, OrderStatus::Active);
    }

    #[test]
    fn s2_fok_no_partial() {
        let mut state = EngineState::default();
        let c = contract();
        let now = now_inside_window(&c);

        submit_order(&mut state, None, "seller", c, Side::Sell, 100, 5, ExecutionType::Gtc, now).unwrap();
        let outcome = submit_order(&mut state, None, "buyer", c, Side::Buy, 100, 10, ExecutionType::Fok, now + 1).unwrap();

        assert_eq!(outcome.status, OrderStatus::Cancelled);
        assert_eq!(outcome.filled_quantity, 0);
        assert_eq!(state.ledger.v2_trades_for_contract(c.delivery_start, c.delivery_end).len(), 0);
        assert_eq!(state.book.peek_top(&c, Side::Sell).unwrap().quantity, 5);
    }

    #[test]
    fn s3_self_match_blocked() {
        let mut state = EngineState::default();
        let c = contract();
        let now = now_inside_window(&c);

        submit_order(&mut state, None, "A", c, Side::Sell, 100, 5, ExecutionType::Gtc, now).unwrap();
        let result = submit_order(&mut state, None, "A", c, Side::Buy, 100, 5, ExecutionType::Gtc, now + 1);
        assert!(matches!(result, Err(ExchangeError::SelfMatch)));
        assert_eq!(state.book.peek_top(&c, Side::Sell).unwrap().quantity, 5);
    }

    #[test]
    fn s4_collateral_gate() {
        let mut state = EngineState::default();
        state.ledger.set_collateral_limit("U", 1000);
        let c = contract();
        let now = now_inside_window(&c);

        let rejected = submit_order(&mut state, None, "U", c, Side::Buy, 600, 2, ExecutionType::Gtc, now);
        assert!(matches!(rejected, Err(ExchangeError::InsufficientCollateral)));

        let admitted = submit_order(&mut state, None, "U", c, Side::Buy, 500, 2, ExecutionType::Gtc, now + 1);
        assert!(admitted.is_ok());
    }

    #[test]
    fn s6_trading_window() {
        let c = contract();
        let mut state = EngineState::default();

        let too_early = submit_order(&mut state, None, "A", c, Side::Buy, 100, 1, ExecutionType::Gtc, c.delivery_start - 16 * 86_400_000);
        assert!(matches!(too_early, Err(ExchangeError::TooEarly)));

        let too_late = submit_order(&mut state, None, "A", c, Side::Buy, 100, 1, ExecutionType::Gtc, c.delivery_start - 30_000);
        assert!(matches!(too_late, Err(ExchangeError::TooLate)));
    }

    #[test]
    fn cancel_then_cancel_again_is_not_found() {
        let mut state = EngineState::default();
        let c = contract();
        let now = now_inside_window(&c);
        let outcome = submit_order(&mut state, None, "A", c, Side::Buy, 100, 1, ExecutionType::Gtc, now).unwrap();

        cancel_order(&mut state, None, "A", outcome.order_id).unwrap();
        let second = cancel_order(&mut state, None, "A", outcome.order_id);
        assert!(matches!(second, Err(ExchangeError::NotFound(_))));
    }

    #[test]
    fn modify_rebases_original_quantity_across_a_partial_fill_then_increase() {
        let mut state = EngineState::default();
        let c = contract();
        let now = now_inside_window(&c);

        let resting = submit_order(&mut state, None, "maker", c, Side::Sell, 100, 10, ExecutionType::Gtc, now).unwrap();
        // partially fill it
        submit_order(&mut state, None, "taker", c, Side::Buy, 100, 4, ExecutionType::Gtc, now + 1).unwrap();
        let order = state.book.get(&resting.order_id).unwrap();
        assert_eq!(order.quantity, 6);
        assert_eq!(order.filled_quantity(), 4);

        // increase remaining quantity by 5 (same price => keep_time_priority would be false since delta_qty>0)
        let modify_outcome = modify_order(&mut state, None, "maker", resting.order_id, 100, 11, now + 2).unwrap();
        assert_eq!(modify_outcome.status, OrderStatus::Active);
        let order = state.book.get(&modify_outcome.order_id).unwrap();
        assert_eq!(order.original_quantity, 15); // filled_so_far(4) + new_quantity(11)
        assert_eq!(order.filled_quantity(), 4);
    }
}
