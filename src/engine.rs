//! The single engine mutex and its public surface.
//!
//! `Engine` is the one object every handler talks to. Every mutating
//! method here takes the lock, runs to completion without performing any
//! I/O while holding it, then — after releasing the lock — flushes a
//! snapshot from a cheaply-cloned consistent state. Event-bus
//! publications happen *inside* the critical section, since they're
//! non-blocking in-process channel sends.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::auth::credentials::{DnaLoginError, DnaSubmitError, PasswordChangeError};
use crate::bulk::{BulkContractBatch, BulkOpResult};
use crate::clock::Clock;
use crate::errors::ExchangeError;
use crate::events::EventBus;
use crate::ledger::UNLIMITED_COLLATERAL;
use crate::matching::{self, engine as matching_engine, EngineState, MatchOutcome};
use crate::models::{Contract, ExecutionType, Order, Side, Trade, V1Order};
use crate::snapshot::{self, SnapshotData};
use crate::{bulk, dna, v1};

pub struct Engine {
    state: Mutex<EngineState>,
    pub clock: Arc<dyn Clock>,
    pub events: EventBus,
    snapshot_path: Option<PathBuf>,
}

impl Engine {
    pub fn new(clock: Arc<dyn Clock>, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            clock,
            events: EventBus::new(),
            snapshot_path,
        }
    }

    /// Loads the snapshot at `snapshot_path`, if any, rebuilding balances
    /// from the replayed V2 trade log.
    pub fn bootstrap(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        match snapshot::load(path) {
            Ok(Some(data)) => {
                let mut state = self.state.lock();
                snapshot::restore(&mut state, data);
                tracing::info!(path = %path.display(), "restored snapshot");
            }
            Ok(None) => tracing::info!(path = %path.display(), "no snapshot found, starting empty"),
            Err(e) => tracing::warn!(%e, "failed to load snapshot, starting empty"),
        }
    }

    fn persist(&self, data: SnapshotData) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Err(e) = snapshot::write_atomic(path, &data) {
            tracing::warn!(%e, "snapshot write failed; service remains live without durability");
        }
    }

    /// Captures state under lock, then writes outside it — callers invoke
    /// this right after releasing `state.lock()`.
    fn persist_current(&self) {
        let data = {
            let state = self.state.lock();
            snapshot::capture(&state)
        };
        self.persist(data);
    }

    // -- Credentials --------------------------------------------------

    pub fn resolve_token(&self, token: &str) -> Option<String> {
        self.state.lock().credentials.resolve(token)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<(), ExchangeError> {
        if username.is_empty() || password.is_empty() {
            return Err(ExchangeError::BadRequest("username and password are required".into()));
        }
        let created = {
            let mut state = self.state.lock();
            state.credentials.register(username, password)
        };
        if !created {
            return Err(ExchangeError::Conflict("username already exists".into()));
        }
        self.persist_current();
        Ok(())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, ExchangeError> {
        self.state
            .lock()
            .credentials
            .login(username, password)
            .ok_or_else(|| ExchangeError::Unauthorized("invalid username or password".into()))
    }

    pub fn change_password(&self, username: &str, old_password: &str, new_password: &str) -> Result<(), ExchangeError> {
        {
            let mut state = self.state.lock();
            state
                .credentials
                .change_password(username, old_password, new_password)
                .map_err(|e| match e {
                    PasswordChangeError::NotFound => ExchangeError::Unauthorized("invalid username or password".into()),
                    PasswordChangeError::WrongPassword => ExchangeError::Unauthorized("invalid username or password".into()),
                })?;
        }
        self.persist_current();
        Ok(())
    }

    pub fn submit_dna(&self, username: &str, password: &str, sample: &str) -> Result<(), ExchangeError> {
        if !dna::is_valid_dna(sample) {
            return Err(ExchangeError::BadRequest("invalid DNA sample".into()));
        }
        {
            let mut state = self.state.lock();
            state.credentials.submit_dna(username, password, sample).map_err(|e| match e {
                DnaSubmitError::NotFound => ExchangeError::Unauthorized("invalid username or password".into()),
                DnaSubmitError::WrongPassword => ExchangeError::Unauthorized("invalid username or password".into()),
            })?;
        }
        self.persist_current();
        Ok(())
    }

    pub fn dna_login(&self, username: &str, sample: &str) -> Result<String, ExchangeError> {
        if !dna::is_valid_dna(sample) {
            return Err(ExchangeError::BadRequest("invalid DNA sample".into()));
        }
        self.state.lock().credentials.dna_login(username, sample).map_err(|e| match e {
            DnaLoginError::NotFound => ExchangeError::Unauthorized("user not found".into()),
            DnaLoginError::NoSamplesRegistered => ExchangeError::Unauthorized("no DNA samples registered".into()),
            DnaLoginError::NoMatch => ExchangeError::Unauthorized("no matching DNA sample".into()),
        })
    }

    // -- V2 orders ------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn submit_order(
        &self,
        owner: &str,
        contract: Contract,
        side: Side,
        price: i64,
        quantity: i64,
        execution_type: ExecutionType,
    ) -> Result<MatchOutcome, ExchangeError> {
        let now = self.clock.now_ms();
        let outcome = {
            let mut state = self.state.lock();
            matching_engine::submit_order(&mut state, Some(&self.events), owner, contract, side, price, quantity, execution_type, now)?
        };
        self.persist_current();
        Ok(outcome)
    }

    pub fn modify_order(&self, owner: &str, order_id: Uuid, price: i64, quantity: i64) -> Result<MatchOutcome, ExchangeError> {
        let now = self.clock.now_ms();
        let outcome = {
            let mut state = self.state.lock();
            matching_engine::modify_order(&mut state, Some(&self.events), owner, order_id, price, quantity, now)?
        };
        self.persist_current();
        Ok(outcome)
    }

    pub fn cancel_order(&self, owner: &str, order_id: Uuid) -> Result<(), ExchangeError> {
        {
            let mut state = self.state.lock();
            matching_engine::cancel_order(&mut state, Some(&self.events), owner, order_id)?;
        }
        self.persist_current();
        Ok(())
    }

    /// Book snapshot for a contract. Returns an empty book outside the
    /// trading window rather than failing.
    pub fn book_snapshot(&self, contract: Contract) -> (Vec<Order>, Vec<Order>) {
        let now = self.clock.now_ms();
        if crate::matching::admission::check_trading_window(&contract, now).is_err() {
            return (Vec::new(), Vec::new());
        }
        self.state.lock().book.snapshot(&contract)
    }

    pub fn my_orders(&self, username: &str) -> Vec<Order> {
        self.state.lock().book.orders_by_owner(username)
    }

    pub fn my_trades(&self, username: &str, contract: Contract) -> Vec<Trade> {
        self.state.lock().ledger.trades_for_user_in_contract(username, contract.delivery_start, contract.delivery_end)
    }

    pub fn v2_trades(&self, contract: Contract) -> Vec<Trade> {
        self.state.lock().ledger.v2_trades_for_contract(contract.delivery_start, contract.delivery_end)
    }

    /// `{balance, potential_balance, collateral}` — collateral reports
    /// `2^63 - 1` when unlimited.
    pub fn balance_info(&self, username: &str) -> (i64, i64, i64) {
        let state = self.state.lock();
        let balance = state.ledger.balance(username);
        let potential = state.ledger.potential_balance(username, &state.book);
        let collateral = state.ledger.collateral_limit(username).unwrap_or(UNLIMITED_COLLATERAL);
        (balance, potential, collateral)
    }

    pub fn set_collateral(&self, username: &str, limit: i64) {
        {
            let mut state = self.state.lock();
            state.ledger.set_collateral_limit(username, limit);
        }
        self.persist_current();
    }

    // -- Bulk transaction -------------------------------------------------

    pub fn bulk_operations(&self, batches: Vec<BulkContractBatch>) -> Result<Vec<BulkOpResult>, ExchangeError> {
        let now = self.clock.now_ms();
        let results = {
            let mut state = self.state.lock();
            bulk::execute_bulk(&mut state, &self.events, now, &batches)?
        };
        self.persist_current();
        Ok(results)
    }

    // -- Legacy V1 orders ------------------------------------------------

    pub fn submit_v1_order(&self, owner: &str, delivery_start: i64, delivery_end: i64, price: i64, quantity: i64) -> Uuid {
        let mut state = self.state.lock();
        v1::submit_v1_order(&mut state, owner, delivery_start, delivery_end, price, quantity)
    }

    pub fn list_v1_orders(&self, delivery_start: Option<i64>) -> Vec<V1Order> {
        v1::list_v1_orders(&self.state.lock(), delivery_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn engine_with_clock(now: i64) -> Engine {
        Engine::new(Arc::new(FixedClock::new(now)), None)
    }

    #[test]
    fn register_login_then_password_change_revokes_token() {
        let engine = engine_with_clock(0);
        engine.register("alice", "pw1").unwrap();
        assert!(matches!(engine.register("alice", "pw2"), Err(ExchangeError::Conflict(_))));

        let token = engine.login("alice", "pw1").unwrap();
        assert_eq!(engine.resolve_token(&token), Some("alice".to_string()));

        engine.change_password("alice", "pw1", "pw2").unwrap();
        assert_eq!(engine.resolve_token(&token), None);
    }

    #[test]
    fn order_outside_trading_window_reads_as_empty_book() {
        let contract = Contract::new(100 * Contract::HOUR_MS, 101 * Contract::HOUR_MS);
        let engine = engine_with_clock(contract.delivery_start - 20 * 86_400_000); // before window
        let (bids, asks) = engine.book_snapshot(contract);
        assert!(bids.is_empty() && asks.is_empty());
    }
}
