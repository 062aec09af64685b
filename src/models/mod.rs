pub mod contract;
pub mod order;
pub mod trade;
pub mod user;

pub use contract::Contract;
pub use order::{ExecutionType, Order, OrderStatus, Side, V1Order};
pub use trade::{Trade, TradeSource};
pub use user::UserRecord;
