//! Configuration for the gate engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Secret seeded into the store on first run
pub const DEFAULT_SECRET: &str = "Au";
/// Minimum length accepted by a secret change
pub const MIN_SECRET_LEN: usize = 3;

/// Gate configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// URL of the credential-entry UI
    pub gate_url: String,
    /// URLs under these prefixes are never redirected
    pub internal_url_prefixes: Vec<String>,
    /// `NavigationBegin` is only gated for these schemes
    pub guarded_schemes: Vec<String>,
    pub default_secret: String,
    pub min_secret_len: usize,
    /// Timeout applied to every persisted-store call
    pub store_timeout_ms: u64,
    /// Re-decide attempts when an auth transition races a decision
    pub max_stale_retries: u32,
    /// Send released sessions back to the URL they were blocked on
    pub restore_after_login: bool,
    /// Open the gate UI when a lock leaves no session to redirect
    pub open_gate_when_idle: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            gate_url: "chrome-extension://safegate/popup.html".to_string(),
            internal_url_prefixes: vec!["chrome-extension://".to_string()],
            guarded_schemes: vec!["http".to_string(), "https".to_string()],
            default_secret: DEFAULT_SECRET.to_string(),
            min_secret_len: MIN_SECRET_LEN,
            store_timeout_ms: 2_000,
            max_stale_retries: 3,
            restore_after_login: true,
            open_gate_when_idle: true,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate_url.trim().is_empty() {
            return Err(ConfigError::EmptyGateUrl);
        }
        if self.default_secret.is_empty() {
            return Err(ConfigError::EmptyDefaultSecret);
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::ZeroStoreTimeout);
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn with_gate_url(mut self, gate_url: impl Into<String>) -> Self {
        self.gate_url = gate_url.into();
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = timeout.as_millis() as u64;
        self
    }
}
