//! Shared runtime state for lex-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The dictionary store is
//! held behind the engine's trait object so tests can swap in the in-memory
//! backend.

use std::sync::Arc;

use lex_engine::DictionaryStore;
use serde::{Deserialize, Serialize};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub store: Arc<dyn DictionaryStore>,
    /// Hash of the effective layered config, if one was loaded.
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn DictionaryStore>) -> Self {
        Self {
            build: BuildInfo {
                service: "lex-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            store,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
