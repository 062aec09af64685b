//! Bulk transaction: atomic simulate-then-commit over a batch of
//! create/modify/cancel operations spanning multiple contracts and
//! participants.
//!
//! Simulate and commit share the exact same `matching::engine` entry
//! points used by the singleton order paths — simulate runs them against
//! a cloned `EngineState` with `events: None` (a pure dry run whose
//! mutations and any freshly-minted order/trade ids are discarded);
//! commit re-runs the identical op sequence against the real state with
//! events enabled. Because the whole call holds the single engine mutex
//! for its entire duration, nothing can observe or mutate real state
//! between the two passes, so commit is guaranteed to reproduce exactly
//! what simulate validated, without needing a literal effect log.

use uuid::Uuid;

use crate::errors::ExchangeError;
use crate::events::EventBus;
use crate::matching::{engine, EngineState};
use crate::models::{Contract, ExecutionType, OrderStatus, Side};

#[derive(Debug, Clone)]
pub enum BulkOp {
    Create {
        participant_token: String,
        side: Side,
        price: i64,
        quantity: i64,
        execution_type: ExecutionType,
    },
    Modify {
        participant_token: String,
        order_id: Uuid,
        price: i64,
        quantity: i64,
    },
    Cancel {
        participant_token: String,
        order_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct BulkContractBatch {
    pub contract: Contract,
    pub operations: Vec<BulkOp>,
}

#[derive(Debug, Clone)]
pub struct BulkOpResult {
    pub op_type: &'static str,
    pub order_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

fn resolve_owner(state: &EngineState, token: &str) -> Result<String, ExchangeError> {
    state
        .credentials
        .resolve(token)
        .ok_or_else(|| ExchangeError::Unauthorized("invalid participant token".into()))
}

fn apply_op(
    state: &mut EngineState,
    events: Option<&EventBus>,
    contract: Contract,
    op: &BulkOp,
    now: i64,
) -> Result<BulkOpResult, ExchangeError> {
    match op {
        BulkOp::Create {
            participant_token,
            side,
            price,
            quantity,
            execution_type,
        } => {
            let owner = resolve_owner(state, participant_token)?;
            let outcome = engine::submit_order(state, events, &owner, contract, *side, *price, *quantity, *execution_type, now)?;
            Ok(BulkOpResult {
                op_type: "create",
                order_id: Some(outcome.order_id),
                status: Some(outcome.status),
            })
        }
        BulkOp::Modify {
            participant_token,
            order_id,
            price,
            quantity,
        } => {
            let owner = resolve_owner(state, participant_token)?;
            let outcome = engine::modify_order(state, events, &owner, *order_id, *price, *quantity, now)?;
            Ok(BulkOpResult {
                op_type: "modify",
                order_id: Some(outcome.order_id),
                status: Some(outcome.status),
            })
        }
        BulkOp::Cancel {
            participant_token,
            order_id,
        } => {
            let owner = resolve_owner(state, participant_token)?;
            engine::cancel_order(state, events, &owner, *order_id)?;
            Ok(BulkOpResult {
                op_type: "cancel",
                order_id: Some(*order_id),
                status: Some(OrderStatus::Cancelled),
            })
        }
    }
}

/// Runs the whole batch. On the first failing op, the shadow pass aborts
/// and returns that op's error without touching real state; on success,
/// the same op sequence is re-applied for real, in order, emitting events.
pub fn execute_bulk(
    state: &mut EngineState,
    events: &EventBus,
    now: i64,
    batches: &[BulkContractBatch],
) -> Result<Vec<BulkOpResult>, ExchangeError> {
    let mut shadow = state.clone();
    for batch in batches {
        for op in &batch.operations {
            apply_op(&mut shadow, None, batch.contract, op, now)?;
        }
    }

    let mut results = Vec::new();
    for batch in batches {
        for op in &batch.operations {
            results.push(apply_op(state, Some(events), batch.contract, op, now)?);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> Contract {
        Contract::new(100 * Contract::HOUR_MS, 101 * Contract::HOUR_MS)
    }

    fn now_inside_window(c: &Contract) -> i64 {
        c.delivery_start - 3_600_000
    }

    #[test]
    fn s5_bulk_atomicity_aborts_whole_batch_on_one_failure() {
        let mut state = EngineState::default();
        state.credentials.register("alice", "pw");
        let token = state.credentials.login("alice", "pw").unwrap();
        let c = contract();
        let now = now_inside_window(&c);
        let bus = EventBus::new();

        let batch = BulkContractBatch {
            contract: c,
            operations: vec![
                BulkOp::Create {
                    participant_token: token.clone(),
                    side: Side::Buy,
                    price: 100,
                    quantity: 5,
                    execution_type: ExecutionType::Gtc,
                },
                BulkOp::Cancel {
                    participant_token: token,
                    order_id: Uuid::new_v4(), // does not exist
                },
            ],
        };

        let result = execute_bulk(&mut state, &bus, now, std::slice::from_ref(&batch));
        assert!(matches!(result, Err(ExchangeError::NotFound(_))));
        // book and ledger are untouched: no resting order from the create op
        assert!(state.book.peek_top(&c, Side::Buy).is_none());
    }

    #[test]
    fn bulk_same_batch_self_reference_create_then_cancel() {
        let mut state = EngineState::default();
        state.credentials.register("bob", "pw");
        let token = state.credentials.login("bob", "pw").unwrap();
        let c = contract();
        let now = now_inside_window(&c);
        let bus = EventBus::new();

        // We don't know the order_id ahead of time in a real request, but
        // within one simulate pass the shadow id is internal; exercising
        // create-then-cancel-by-returned-id happens at the handler layer.
        // Here we confirm a batch of two independent creates both commit.
        let batch = BulkContractBatch {
            contract: c,
            operations: vec![
                BulkOp::Create {
                    participant_token: token.clone(),
                    side: Side::Buy,
                    price: 100,
                    quantity: 5,
                    execution_type: ExecutionType::Gtc,
                },
                BulkOp::Create {
                    participant_token: token,
                    side: Side::Buy,
                    price: 90,
                    quantity: 3,
                    execution_type: ExecutionType::Gtc,
                },
            ],
        };

        let results = execute_bulk(&mut state, &bus, now, std::slice::from_ref(&batch)).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == Some(OrderStatus::Active)));
    }
}
