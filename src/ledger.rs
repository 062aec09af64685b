//! Ledger: per-user balance, per-user collateral limit, and the
//! append-only trade log.
//!
//! Collateral absent means unlimited (`2^63 - 1` is reported at the API
//! boundary).

use std::collections::HashMap;

use crate::book::OrderBook;
use crate::models::{Order, Trade, TradeSource};

pub const UNLIMITED_COLLATERAL: i64 = i64::MAX;

#[derive(Debug, Default, Clone)]
pub struct Ledger {
    balances: HashMap<String, i64>,
    collateral_limits: HashMap<String, i64>,
    trades: Vec<Trade>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, username: &str) -> i64 {
        self.balances.get(username).copied().unwrap_or(0)
    }

    pub fn collateral_limit(&self, username: &str) -> Option<i64> {
        self.collateral_limits.get(username).copied()
    }

    pub fn set_collateral_limit(&mut self, username: &str, limit: i64) {
        self.collateral_limits.insert(username.to_string(), limit);
    }

    /// `balance(u) + Σ over u's ACTIVE orders of signed_commitment(o)`
    pub fn potential_balance(&self, username: &str, book: &OrderBook) -> i64 {
        let committed: i64 = book
            .active_orders_by_owner(username)
            .iter()
            .map(Order::signed_commitment)
            .sum();
        self.balance(username) + committed
    }

    /// Would admitting `signed_commitment` on top of `username`'s current
    /// potential balance violate their collateral limit? Only meaningful
    /// when `signed_commitment` is negative, i.e. liability-increasing, but
    /// the arithmetic is sound either way since a positive commitment only
    /// raises potential balance.
    pub fn admits_commitment(&self, username: &str, book: &OrderBook, signed_commitment: i64) -> bool {
        let limit = self.collateral_limit(username).unwrap_or(UNLIMITED_COLLATERAL);
        if limit == UNLIMITED_COLLATERAL {
            return true;
        }
        self.potential_balance(username, book) + signed_commitment >= -limit
    }

    /// Applies a trade atomically: debits the buyer, credits the seller,
    /// appends to the immutable log.
    pub fn apply_trade(&mut self, trade: Trade) {
        let amount = trade.price * trade.quantity;
        *self.balances.entry(trade.buyer_id.clone()).or_insert(0) -= amount;
        *self.balances.entry(trade.seller_id.clone()).or_insert(0) += amount;
        self.trades.push(trade);
    }

    /// All trades for a contract, newest first.
    pub fn trades_for_contract(&self, delivery_start: i64, delivery_end: i64) -> Vec<Trade> {
        let mut out: Vec<Trade> = self
            .trades
            .iter()
            .filter(|t| t.delivery_start == delivery_start && t.delivery_end == delivery_end)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    /// V2-only trades for a contract, newest first.
    pub fn v2_trades_for_contract(&self, delivery_start: i64, delivery_end: i64) -> Vec<Trade> {
        self.trades_for_contract(delivery_start, delivery_end)
            .into_iter()
            .filter(|t| t.source == TradeSource::V2)
            .collect()
    }

    /// Trades involving `username` within a contract, newest first.
    pub fn trades_for_user_in_contract(&self, username: &str, delivery_start: i64, delivery_end: i64) -> Vec<Trade> {
        self.trades_for_contract(delivery_start, delivery_end)
            .into_iter()
            .filter(|t| t.buyer_id == username || t.seller_id == username)
            .collect()
    }

    /// V2 subset of the trade log, for snapshotting.
    pub fn snapshot_v2_trades(&self) -> Vec<Trade> {
        self.trades.iter().filter(|t| t.source == TradeSource::V2).cloned().collect()
    }

    pub fn snapshot_collateral(&self) -> HashMap<String, i64> {
        self.collateral_limits.clone()
    }

    pub fn restore_collateral(&mut self, limits: HashMap<String, i64>) {
        self.collateral_limits = limits;
    }

    /// Rebuilds `balances` from scratch by replaying V2 trades in order.
    pub fn restore_v2_trades(&mut self, trades: Vec<Trade>) {
        self.balances.clear();
        self.trades.retain(|t| t.source != TradeSource::V2);
        for trade in trades {
            self.apply_trade(trade);
        }
    }

    /// Appends a V1 trade to the shared log without touching balances
    /// beyond the same credit/debit rule — V1 and V2 share only the trade
    /// log and the ledger.
    pub fn record_v1_trade(&mut self, trade: Trade) {
        self.apply_trade(trade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn trade(buyer: &str, seller: &str, price: i64, qty: i64, ts: i64) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            buyer_id: buyer.to_string(),
            seller_id: seller.to_string(),
            price,
            quantity: qty,
            timestamp: ts,
            delivery_start: 0,
            delivery_end: crate::models::Contract::HOUR_MS,
            source: TradeSource::V2,
        }
    }

    #[test]
    fn apply_trade_updates_both_sides() {
        let mut ledger = Ledger::new();
        ledger.apply_trade(trade("buyer", "seller", 100, 5, 1));
        assert_eq!(ledger.balance("buyer"), -500);
        assert_eq!(ledger.balance("seller"), 500);
    }

    #[test]
    fn unlimited_collateral_always_admits() {
        let ledger = Ledger::new();
        let book = OrderBook::new();
        assert!(ledger.admits_commitment("nobody", &book, -1_000_000));
    }

    #[test]
    fn collateral_gate_rejects_over_limit() {
        let mut ledger = Ledger::new();
        ledger.set_collateral_limit("u", 1000);
        let book = OrderBook::new();
        assert!(!ledger.admits_commitment("u", &book, -1200));
        assert!(ledger.admits_commitment("u", &book, -1000));
    }

    #[test]
    fn restore_v2_trades_rebuilds_balances_only_from_v2() {
        let mut ledger = Ledger::new();
        ledger.record_v1_trade(Trade {
            source: TradeSource::V1,
            ..trade("a", "b", 10, 1, 0)
        });
        ledger.restore_v2_trades(vec![trade("x", "y", 50, 2, 5)]);
        assert_eq!(ledger.balance("x"), -100);
        assert_eq!(ledger.balance("y"), 100);
        // v1 trade survives in the log but doesn't affect balances beyond what was replayed
        assert_eq!(ledger.balance("a"), 0);
    }
}
