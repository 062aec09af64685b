//! Order book: per-contract, two-sided, price-time-priority.
//!
//! A `BTreeMap<i64, VecDeque<Order>>` per side, plus an `order_id ->
//! (side, price)` index for O(log n)-ish modify/cancel. Bid levels key
//! on negated price so that `BTreeMap`'s ascending iteration yields
//! highest price first; ask levels key on price directly.

use std::collections::{BTreeMap, HashMap, VecDeque};

use uuid::Uuid;

use crate::models::{Contract, Order, Side};

#[derive(Debug, Clone, Copy)]
struct Location {
    contract: Contract,
    side: Side,
}

#[derive(Debug, Default, Clone)]
struct ContractBook {
    bids: BTreeMap<i64, VecDeque<Order>>,
    asks: BTreeMap<i64, VecDeque<Order>>,
}

impl ContractBook {
    fn levels(&self, side: Side) -> &BTreeMap<i64, VecDeque<Order>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<i64, VecDeque<Order>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

fn level_key(side: Side, price: i64) -> i64 {
    match side {
        Side::Buy => -price,
        Side::Sell => price,
    }
}

/// The full multi-contract book. Owns every ACTIVE order; terminal orders
/// are removed immediately — the book stores only ACTIVE orders.
#[derive(Debug, Default, Clone)]
pub struct OrderBook {
    contracts: HashMap<Contract, ContractBook>,
    index: HashMap<Uuid, Location>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an ACTIVE order as a new resting order at the back of its
    /// price level (time priority is FIFO within a level).
    pub fn insert(&mut self, order: Order) {
        debug_assert!(order.is_active());
        let contract = order.contract;
        let side = order.side;
        let order_id = order.order_id;
        let key = level_key(side, order.price);

        self.contracts
            .entry(contract)
            .or_default()
            .levels_mut(side)
            .entry(key)
            .or_default()
            .push_back(order);

        self.index.insert(order_id, Location { contract, side });
    }

    pub fn get(&self, order_id: &Uuid) -> Option<&Order> {
        let loc = self.index.get(order_id)?;
        let book = self.contracts.get(&loc.contract)?;
        book.levels(loc.side)
            .values()
            .flat_map(|dq| dq.iter())
            .find(|o| &o.order_id == order_id)
    }

    /// Removes an order by id from wherever it rests, returning it. Used by
    /// cancel and by modify (remove-then-reinsert-via-admission).
    pub fn remove_by_id(&mut self, order_id: &Uuid) -> Option<Order> {
        let loc = self.index.remove(order_id)?;
        let book = self.contracts.get_mut(&loc.contract)?;
        let levels = book.levels_mut(loc.side);

        let mut found_key = None;
        let mut removed = None;
        for (key, dq) in levels.iter_mut() {
            if let Some(pos) = dq.iter().position(|o| &o.order_id == order_id) {
                removed = dq.remove(pos);
                found_key = Some(*key);
                break;
            }
        }
        if let Some(key) = found_key {
            if levels.get(&key).map(|dq| dq.is_empty()).unwrap_or(false) {
                levels.remove(&key);
            }
        }
        removed
    }

    /// The best (highest-priority) resting order on `side` for `contract`,
    /// i.e. the order the matching loop would treat as "top".
    pub fn peek_top(&self, contract: &Contract, side: Side) -> Option<&Order> {
        let book = self.contracts.get(contract)?;
        book.levels(side).values().flat_map(|dq| dq.iter()).next()
    }

    /// Decrements the top order's quantity by `qty` in place. Panics if
    /// there is no top order or `qty` exceeds its quantity — callers only
    /// call this with a `qty` already bounded by `peek_top`.
    pub fn reduce_top(&mut self, contract: &Contract, side: Side, qty: i64) {
        let book = self.contracts.get_mut(contract).expect("contract book must exist");
        let (_, dq) = book
            .levels_mut(side)
            .iter_mut()
            .next()
            .expect("top level must exist");
        let top = dq.front_mut().expect("top order must exist");
        assert!(qty <= top.quantity, "reduce_top: qty exceeds resting quantity");
        top.quantity -= qty;
    }

    /// Removes the top order of `side`/`contract` (used once its quantity
    /// has been reduced to zero) and returns it.
    pub fn remove_top(&mut self, contract: &Contract, side: Side) -> Option<Order> {
        let book = self.contracts.get_mut(contract)?;
        let levels = book.levels_mut(side);
        let key = *levels.iter().next()?.0;
        let dq = levels.get_mut(&key)?;
        let order = dq.pop_front();
        if dq.is_empty() {
            levels.remove(&key);
        }
        if let Some(o) = &order {
            self.index.remove(&o.order_id);
        }
        order
    }

    /// True iff `side`/`contract` has any resting order at all.
    pub fn has_liquidity(&self, contract: &Contract, side: Side) -> bool {
        self.peek_top(contract, side).is_some()
    }

    /// Sum of quantity available at or better than `limit_price` for an
    /// incoming order of `incoming_side` crossing into `side`'s book. Used
    /// by the FOK preflight — a read-only walk, no mutation.
    pub fn crossable_quantity(&self, contract: &Contract, side: Side, incoming_side: Side, limit_price: i64) -> i64 {
        let Some(book) = self.contracts.get(contract) else {
            return 0;
        };
        book.levels(side)
            .values()
            .flat_map(|dq| dq.iter())
            .take_while(|resting| crosses(incoming_side, limit_price, resting.price))
            .map(|o| o.quantity)
            .sum()
    }

    /// True iff any resting order on `side` owned by `owner` crosses an
    /// incoming order of `incoming_side` at `limit_price` (self-match
    /// prevention).
    pub fn has_self_cross(&self, contract: &Contract, side: Side, incoming_side: Side, limit_price: i64, owner: &str) -> bool {
        let Some(book) = self.contracts.get(contract) else {
            return false;
        };
        book.levels(side)
            .values()
            .flat_map(|dq| dq.iter())
            .take_while(|resting| crosses(incoming_side, limit_price, resting.price))
            .any(|resting| resting.owner == owner)
    }

    /// Snapshot of both sides for a contract, each already in priority
    /// order.
    pub fn snapshot(&self, contract: &Contract) -> (Vec<Order>, Vec<Order>) {
        let Some(book) = self.contracts.get(contract) else {
            return (Vec::new(), Vec::new());
        };
        let bids = book.bids.values().flat_map(|dq| dq.iter()).cloned().collect();
        let asks = book.asks.values().flat_map(|dq| dq.iter()).cloned().collect();
        (bids, asks)
    }

    /// All ACTIVE orders owned by `username` across every contract, newest
    /// `created_at` first.
    pub fn orders_by_owner(&self, username: &str) -> Vec<Order> {
        let mut out: Vec<Order> = self
            .contracts
            .values()
            .flat_map(|book| book.bids.values().chain(book.asks.values()))
            .flat_map(|dq| dq.iter())
            .filter(|o| o.owner == username)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// All ACTIVE orders owned by `username` restricted to one contract
    /// (used by the potential-balance formula).
    pub fn active_orders_by_owner_in(&self, contract: &Contract, username: &str) -> Vec<Order> {
        let Some(book) = self.contracts.get(contract) else {
            return Vec::new();
        };
        book.bids
            .values()
            .chain(book.asks.values())
            .flat_map(|dq| dq.iter())
            .filter(|o| o.owner == username)
            .cloned()
            .collect()
    }

    /// Every active order owned by `username`, across all contracts (used
    /// by the global potential-balance / collateral check).
    pub fn active_orders_by_owner(&self, username: &str) -> Vec<Order> {
        self.contracts
            .values()
            .flat_map(|book| book.bids.values().chain(book.asks.values()))
            .flat_map(|dq| dq.iter())
            .filter(|o| o.owner == username)
            .cloned()
            .collect()
    }

    /// All ACTIVE orders across every contract, for snapshotting.
    pub fn all_active_orders(&self) -> Vec<Order> {
        self.contracts
            .values()
            .flat_map(|book| book.bids.values().chain(book.asks.values()))
            .flat_map(|dq| dq.iter())
            .cloned()
            .collect()
    }
}

fn crosses(incoming_side: Side, incoming_price: i64, resting_price: i64) -> bool {
    match incoming_side {
        Side::Buy => resting_price <= incoming_price,
        Side::Sell => resting_price >= incoming_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExecutionType, OrderStatus};

    fn order(id: u128, owner: &str, side: Side, price: i64, qty: i64, created_at: i64) -> Order {
        Order {
            order_id: Uuid::from_u128(id),
            owner: owner.to_string(),
            contract: Contract::new(0, Contract::HOUR_MS),
            side,
            price,
            quantity: qty,
            original_quantity: qty,
            status: OrderStatus::Active,
            created_at,
            execution_type: ExecutionType::Gtc,
        }
    }

    #[test]
    fn bids_best_is_highest_price_then_earliest() {
        let mut book = OrderBook::new();
        let c = Contract::new(0, Contract::HOUR_MS);
        book.insert(order(1, "a", Side::Buy, 100, 5, 1));
        book.insert(order(2, "b", Side::Buy, 105, 5, 2));
        book.insert(order(3, "c", Side::Buy, 105, 5, 0)); // same price, earlier time

        let top = book.peek_top(&c, Side::Buy).unwrap();
        assert_eq!(top.owner, "c"); // 105 and earliest created_at wins tie
    }

    #[test]
    fn asks_best_is_lowest_price() {
        let mut book = OrderBook::new();
        let c = Contract::new(0, Contract::HOUR_MS);
        book.insert(order(1, "a", Side::Sell, 110, 5, 1));
        book.insert(order(2, "b", Side::Sell, 100, 5, 2));

        let top = book.peek_top(&c, Side::Sell).unwrap();
        assert_eq!(top.owner, "b");
    }

    #[test]
    fn remove_by_id_drops_empty_level() {
        let mut book = OrderBook::new();
        let c = Contract::new(0, Contract::HOUR_MS);
        let id = Uuid::from_u128(7);
        book.insert(order(7, "a", Side::Buy, 100, 5, 1));
        assert!(book.get(&id).is_some());
        let removed = book.remove_by_id(&id).unwrap();
        assert_eq!(removed.owner, "a");
        assert!(book.peek_top(&c, Side::Buy).is_none());
    }

    #[test]
    fn crossable_quantity_stops_at_first_non_crossing_level() {
        let mut book = OrderBook::new();
        let c = Contract::new(0, Contract::HOUR_MS);
        book.insert(order(1, "a", Side::Sell, 100, 5, 1));
        book.insert(order(2, "b", Side::Sell, 100, 3, 2));
        book.insert(order(3, "c", Side::Sell, 110, 10, 3));

        // buy at 100 crosses both 100-priced levels but not the 110 level
        let total = book.crossable_quantity(&c, Side::Sell, Side::Buy, 100);
        assert_eq!(total, 8);
    }

    #[test]
    fn self_cross_detects_owned_crossing_resting_order() {
        let mut book = OrderBook::new();
        let c = Contract::new(0, Contract::HOUR_MS);
        book.insert(order(1, "a", Side::Sell, 100, 5, 1));

        assert!(book.has_self_cross(&c, Side::Sell, Side::Buy, 100, "a"));
        assert!(!book.has_self_cross(&c, Side::Sell, Side::Buy, 100, "b"));
        assert!(!book.has_self_cross(&c, Side::Sell, Side::Buy, 90, "a")); // doesn't cross
    }
}
