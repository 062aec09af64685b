use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contract::Contract;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionType {
    Gtc,
    Ioc,
    Fok,
}

impl Default for ExecutionType {
    fn default() -> Self {
        ExecutionType::Gtc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Active,
    Filled,
    Cancelled,
}

/// A V2 resting/terminal order. The book owns the authoritative copy
/// while `status = ACTIVE`; terminal orders live only in history/snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub owner: String,
    pub contract: Contract,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub original_quantity: i64,
    pub status: OrderStatus,
    pub created_at: i64,
    pub execution_type: ExecutionType,
}

impl Order {
    pub fn filled_quantity(&self) -> i64 {
        self.original_quantity - self.quantity
    }

    /// Signed collateral commitment: buys commit negatively (a liability),
    /// sells commit positively.
    pub fn signed_commitment(&self) -> i64 {
        match self.side {
            Side::Buy => -self.price * self.quantity,
            Side::Sell => self.price * self.quantity,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }
}

/// A legacy V1 order: sell-only, flat-list, single `active` bit. Entirely
/// separate from V2 matching (no cross-matching, no admission pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V1Order {
    pub order_id: Uuid,
    pub owner: String,
    pub delivery_start: i64,
    pub delivery_end: i64,
    pub price: i64,
    pub quantity: i64,
    pub active: bool,
}
