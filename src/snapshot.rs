//! Snapshot/restore: a durable mirror of users, DNA samples, collateral
//! limits, V2 orders, and V2 trades.
//!
//! V1 orders are intentionally excluded — V1 state is intentionally
//! non-durable. Balances are never snapshotted directly; they're rebuilt
//! on load by replaying the persisted V2 trades back through the ledger,
//! which is also what keeps a save+load+save cycle byte-identical for
//! the persisted subset.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matching::EngineState;
use crate::models::{Order, Trade, UserRecord};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnapshotData {
    pub users: Vec<UserRecord>,
    pub collateral: HashMap<String, i64>,
    pub orders: Vec<Order>,
    pub v2_trades: Vec<Trade>,
}

pub fn capture(state: &EngineState) -> SnapshotData {
    SnapshotData {
        users: state.credentials.snapshot_users(),
        collateral: state.ledger.snapshot_collateral(),
        orders: state.book.all_active_orders(),
        v2_trades: state.ledger.snapshot_v2_trades(),
    }
}

/// Restores `state` from a loaded snapshot. Balances are rebuilt from
/// scratch by replaying `v2_trades`, never read directly from disk.
pub fn restore(state: &mut EngineState, data: SnapshotData) {
    state.credentials.restore_users(data.users);
    state.ledger.restore_collateral(data.collateral);
    state.ledger.restore_v2_trades(data.v2_trades);
    state.book = crate::book::OrderBook::new();
    for order in data.orders {
        if order.is_active() {
            state.book.insert(order);
        }
    }
}

/// Writes `data` to `path` via write-temp-then-rename so a crash mid-write
/// never leaves a truncated snapshot on disk.
pub fn write_atomic(path: &Path, data: &SnapshotData) -> io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(data).map_err(io::Error::other)?;
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads a snapshot from `path` if it exists; `Ok(None)` if there's no
/// file there yet (first run with `PERSISTENT_DIR` set).
pub fn load(path: &Path) -> io::Result<Option<SnapshotData>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    let data = serde_json::from_slice(&bytes).map_err(io::Error::other)?;
    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contract, ExecutionType, Side};
    use tempfile_like_dir::TempDir;

    mod tempfile_like_dir {
        use std::path::{Path, PathBuf};

        /// Minimal scoped temp-dir helper so tests don't need an extra
        /// dev-dependency just for this one case.
        pub struct TempDir(PathBuf);

        impl TempDir {
            pub fn new(label: &str) -> Self {
                let mut dir = std::env::temp_dir();
                dir.push(format!("hourblock-exchange-test-{}-{}", label, std::process::id()));
                std::fs::create_dir_all(&dir).unwrap();
                Self(dir)
            }

            pub fn path(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    #[test]
    fn save_load_save_round_trips_byte_identical() {
        let dir = TempDir::new("snapshot");
        let path = dir.path().join("exchange_state.json");

        let mut state = EngineState::default();
        state.credentials.register("alice", "pw");
        state.ledger.set_collateral_limit("alice", 1000);
        state.book.insert(Order {
            order_id: uuid::Uuid::from_u128(1),
            owner: "alice".to_string(),
            contract: Contract::new(0, Contract::HOUR_MS),
            side: Side::Buy,
            price: 10,
            quantity: 5,
            original_quantity: 5,
            status: crate::models::OrderStatus::Active,
            created_at: 0,
            execution_type: ExecutionType::Gtc,
        });

        let snapshot1 = capture(&state);
        write_atomic(&path, &snapshot1).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        let mut restored = EngineState::default();
        restore(&mut restored, loaded);
        let snapshot2 = capture(&restored);

        write_atomic(&path, &snapshot2).unwrap();
        let bytes1 = serde_json::to_vec_pretty(&snapshot1).unwrap();
        let bytes2 = std::fs::read(&path).unwrap();
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = TempDir::new("missing");
        let path = dir.path().join("does_not_exist.json");
        assert!(load(&path).unwrap().is_none());
    }
}
