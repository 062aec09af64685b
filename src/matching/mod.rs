pub mod admission;
pub mod engine;

use crate::auth::CredentialStore;
use crate::book::OrderBook;
use crate::ledger::Ledger;
use crate::models::V1Order;

/// Every piece of mutable state the engine owns, behind one mutex.
/// There is no fine-grained locking below this: book, ledger, credentials,
/// and legacy V1 orders are all mutated together inside one critical
/// section.
#[derive(Debug, Default, Clone)]
pub struct EngineState {
    pub book: OrderBook,
    pub ledger: Ledger,
    pub credentials: CredentialStore,
    pub v1_orders: Vec<V1Order>,
}

pub use engine::{cancel_order, modify_order, submit_order, MatchOutcome};
