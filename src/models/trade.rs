use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSource {
    V1,
    V2,
}

/// Append-only, immutable. V1 and V2 share this log; only V2 trades are
/// snapshotted and replayed to rebuild balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub buyer_id: String,
    pub seller_id: String,
    pub price: i64,
    pub quantity: i64,
    pub timestamp: i64,
    pub delivery_start: i64,
    pub delivery_end: i64,
    pub source: TradeSource,
}

impl Trade {
    /// The role and counterparty of `username` in this trade, or `None` if
    /// uninvolved. Used by `/v2/my-trades` to annotate side/counterparty.
    pub fn role_of(&self, username: &str) -> Option<(Side, &str)> {
        if self.buyer_id == username {
            Some((Side::Buy, &self.seller_id))
        } else if self.seller_id == username {
            Some((Side::Sell, &self.buyer_id))
        } else {
            None
        }
    }
}
