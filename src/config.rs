//! Process configuration, loaded from environment variables.
//!
//! Only one knob is specified externally (`PERSISTENT_DIR`); the rest are
//! fixed defaults. Kept as a small hand-rolled loader rather than pulling
//! in a config-file crate, since there is nothing here that needs layered
//! sources (file + env + CLI) — just env with defaults.

use anyhow::Result;

/// Bearer token accepted by the admin-only collateral endpoint. Hard-coded
/// rather than made configurable.
pub const ADMIN_TOKEN: &str = "password123";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// When set, snapshots are written to `<dir>/exchange_state.json`.
    pub persistent_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let persistent_dir = std::env::var("PERSISTENT_DIR").ok().filter(|s| !s.is_empty());

        Ok(Self { port, persistent_dir })
    }

    pub fn snapshot_path(&self) -> Option<std::path::PathBuf> {
        self.persistent_dir
            .as_ref()
            .map(|dir| std::path::Path::new(dir).join("exchange_state.json"))
    }
}
