//! Event bus: trade stream, order-book-delta stream, and the per-user
//! execution-report stream.
//!
//! Public topics use `tokio::sync::broadcast`, carrying pre-encoded
//! GalacticBuf bytes instead of typed structs, since transport only ever
//! forwards bytes to the socket. The execution-report topic is keyed
//! per-user, so it uses a `DashMap<username, Vec<Sender>>` of bounded
//! `mpsc` channels instead — one broadcast channel per user would be
//! wasteful, and only that user's subscribers ever need those events.
//!
//! Every publish is a non-blocking send performed from inside the engine's
//! critical section: `broadcast::Sender::send` never blocks, and
//! `mpsc::Sender::try_send` either succeeds or the subscriber is dropped.

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use crate::models::{Contract, Order, Trade};
use crate::wire::Message;

const BROADCAST_CAPACITY: usize = 4096;
const EXECUTION_REPORT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookDeltaKind {
    Add,
    Modify,
    Remove,
}

impl BookDeltaKind {
    fn as_str(self) -> &'static str {
        match self {
            BookDeltaKind::Add => "ADD",
            BookDeltaKind::Modify => "MODIFY",
            BookDeltaKind::Remove => "REMOVE",
        }
    }
}

pub struct EventBus {
    trades_tx: broadcast::Sender<Vec<u8>>,
    order_book_tx: broadcast::Sender<Vec<u8>>,
    execution_reports: DashMap<String, Vec<mpsc::Sender<Vec<u8>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (trades_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (order_book_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            trades_tx,
            order_book_tx,
            execution_reports: DashMap::new(),
        }
    }

    pub fn subscribe_trades(&self) -> broadcast::Receiver<Vec<u8>> {
        self.trades_tx.subscribe()
    }

    pub fn subscribe_order_book(&self) -> broadcast::Receiver<Vec<u8>> {
        self.order_book_tx.subscribe()
    }

    /// Registers a new execution-report subscriber for `username`. Late
    /// subscribers see only future events — the bus is not a replay log.
    pub fn subscribe_execution_reports(&self, username: &str) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(EXECUTION_REPORT_CHANNEL_CAPACITY);
        self.execution_reports.entry(username.to_string()).or_default().push(tx);
        rx
    }

    pub fn publish_trade(&self, trade: &Trade) {
        let msg = Message::new()
            .set("trade_id", trade.trade_id.to_string())
            .set("buyer_id", trade.buyer_id.clone())
            .set("seller_id", trade.seller_id.clone())
            .set("price", trade.price)
            .set("quantity", trade.quantity)
            .set("timestamp", trade.timestamp)
            .set("delivery_start", trade.delivery_start)
            .set("delivery_end", trade.delivery_end);
        self.send_encoded(&self.trades_tx, &msg, "trade");
    }

    pub fn publish_book_delta(&self, contract: &Contract, kind: BookDeltaKind, order: &Order) {
        let msg = Message::new()
            .set("type", kind.as_str())
            .set("delivery_start", contract.delivery_start)
            .set("delivery_end", contract.delivery_end)
            .set("order_id", order.order_id.to_string())
            .set("side", side_str(order.side))
            .set("price", order.price)
            .set("quantity", order.quantity);
        self.send_encoded(&self.order_book_tx, &msg, "order_book");
    }

    /// Publishes an execution report for `order`'s owner only.
    pub fn publish_execution_report(&self, order: &Order) {
        let msg = Message::new()
            .set("order_id", order.order_id.to_string())
            .set("status", status_str(order.status))
            .set("price", order.price)
            .set("quantity", order.quantity)
            .set("filled_quantity", order.filled_quantity())
            .set("delivery_start", order.contract.delivery_start)
            .set("delivery_end", order.contract.delivery_end);

        let Ok(bytes) = crate::wire::encode_message(&msg) else {
            tracing::error!("failed to encode execution report");
            return;
        };
        if let Some(mut senders) = self.execution_reports.get_mut(&order.owner) {
            senders.retain(|tx| tx.try_send(bytes.clone()).is_ok());
        }
    }

    fn send_encoded(&self, tx: &broadcast::Sender<Vec<u8>>, msg: &Message, topic: &str) {
        match crate::wire::encode_message(msg) {
            Ok(bytes) => {
                // Err(SendError) just means no subscribers are attached; not a failure.
                let _ = tx.send(bytes);
            }
            Err(e) => tracing::error!(%e, topic, "failed to encode event"),
        }
    }
}

fn side_str(side: crate::models::Side) -> &'static str {
    match side {
        crate::models::Side::Buy => "buy",
        crate::models::Side::Sell => "sell",
    }
}

fn status_str(status: crate::models::OrderStatus) -> &'static str {
    match status {
        crate::models::OrderStatus::Active => "ACTIVE",
        crate::models::OrderStatus::Filled => "FILLED",
        crate::models::OrderStatus::Cancelled => "CANCELLED",
    }
}
