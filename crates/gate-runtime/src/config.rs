//! Runtime configuration.
//!
//! Starts from [`GateConfig::default`] and applies environment overrides.
//! An override that does not parse is logged and ignored.

use std::env;
use std::path::PathBuf;

use gate_core::GateConfig;
use tracing::{info, warn};

/// Default capacity of the outbound action and reply queues
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub gate: GateConfig,
    /// JSON file backing the auth state; `None` keeps it in memory
    pub state_file: Option<PathBuf>,
    pub event_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            state_file: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `GATE_URL`: URL of the credential-entry UI
    /// - `GATE_STORE_TIMEOUT_MS`: Store call timeout in milliseconds
    /// - `GATE_STATE_FILE`: Path of the persisted state file
    /// - `GATE_EVENT_BUFFER`: Outbound queue capacity
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("GATE_URL") {
            if url.trim().is_empty() {
                warn!("GATE_URL is empty, keeping {}", config.gate.gate_url);
            } else {
                config.gate.gate_url = url;
            }
        }

        if let Some(raw) = lookup("GATE_STORE_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.gate.store_timeout_ms = ms,
                _ => warn!("GATE_STORE_TIMEOUT_MS must be a positive integer, got {raw:?}"),
            }
        }

        if let Some(path) = lookup("GATE_STATE_FILE").filter(|p| !p.trim().is_empty()) {
            info!("Persisting auth state to {path}");
            config.state_file = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("GATE_EVENT_BUFFER") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.event_buffer = n,
                _ => warn!("GATE_EVENT_BUFFER must be a positive integer, got {raw:?}"),
            }
        }

        config
    }
}
