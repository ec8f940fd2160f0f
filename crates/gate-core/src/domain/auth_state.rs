//! Authentication state and the gate state machine
//!
//! State Machine:
//! ```text
//! [LOCKED notReady] ──initialize──→ [LOCKED ready] ──login success──→ [UNLOCKED]
//!                                        ↑                                │
//!                                        └── logout | last session closed ┘
//!                                            | process/browser restart
//! ```
//!
//! Every process boot starts in `Locked { ready: false }`. There is no
//! terminal state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::StoreError;

/// Store key: whether a user is currently authenticated
pub const KEY_IS_LOGGED_IN: &str = "isLoggedIn";
/// Store key: `false` once first-run seeding happened, absent before
pub const KEY_IS_FIRST_RUN: &str = "isFirstRun";
/// Store key: the credential secret, stored in plaintext
pub const KEY_PASSWORD: &str = "password";

/// Key-value payload exchanged with the persisted store
pub type StoreMap = HashMap<String, Value>;

/// Monotonic counter bumped on every auth transition
pub type AuthEpoch = u64;

/// The credential secret.
///
/// Held in memory as plaintext and compared as plaintext, exactly as it is
/// persisted. Zeroed on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CredentialSecret {
    inner: String,
}

impl CredentialSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            inner: secret.into(),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.inner == candidate
    }

}

impl std::fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialSecret(***)")
    }
}

/// In-memory mirror of the persisted auth record
#[derive(Clone, Debug, Default)]
pub struct AuthState {
    pub is_logged_in: bool,
    pub initialized: bool,
}

/// Observable gate state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Locked { ready: bool },
    Unlocked,
}

impl Default for GateState {
    fn default() -> Self {
        GateState::Locked { ready: false }
    }
}

/// Inputs that move the state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateTransition {
    Initialize,
    LoginSucceeded,
    Logout,
}

impl GateState {
    /// Deterministic transition function.
    ///
    /// A login cannot unlock a gate that is not ready, and a logout never
    /// marks an uninitialized gate as ready.
    pub fn transition(self, input: GateTransition) -> GateState {
        match (self, input) {
            (_, GateTransition::Initialize) => GateState::Locked { ready: true },
            (GateState::Locked { ready: true }, GateTransition::LoginSucceeded) => {
                GateState::Unlocked
            }
            (GateState::Unlocked, GateTransition::LoginSucceeded) => GateState::Unlocked,
            (GateState::Locked { ready: false }, GateTransition::LoginSucceeded) => {
                GateState::Locked { ready: false }
            }
            (GateState::Locked { ready }, GateTransition::Logout) => GateState::Locked { ready },
            (GateState::Unlocked, GateTransition::Logout) => GateState::Locked { ready: true },
        }
    }

    pub fn is_unlocked(self) -> bool {
        matches!(self, GateState::Unlocked)
    }

    pub fn is_ready(self) -> bool {
        !matches!(self, GateState::Locked { ready: false })
    }
}

impl AuthState {
    pub fn gate_state(&self) -> GateState {
        match (self.initialized, self.is_logged_in) {
            (false, _) => GateState::Locked { ready: false },
            (true, false) => GateState::Locked { ready: true },
            (true, true) => GateState::Unlocked,
        }
    }
}

/// Read an optional boolean. Absent and `null` both mean "undefined".
pub fn read_bool(map: &StoreMap, key: &str) -> Result<Option<bool>, StoreError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(StoreError::Decode {
            key: key.to_string(),
            reason: format!("expected bool, found {other}"),
        }),
    }
}

/// Read an optional string. Absent and `null` both mean "undefined".
pub fn read_string(map: &StoreMap, key: &str) -> Result<Option<String>, StoreError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(StoreError::Decode {
            key: key.to_string(),
            reason: format!("expected string, found {other}"),
        }),
    }
}
