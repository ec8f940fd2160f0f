//! Error types for the gate engine
//!
//! Every variant is recoverable. The controller never crashes on a failed
//! store or navigator call; it degrades to the locked behavior instead.

use thiserror::Error;

use crate::domain::{SecretChangeRejection, SessionId};

/// Result alias used across the engine
pub type GateResult<T> = Result<T, GateError>;

/// Errors that can occur in the gate engine
#[derive(Debug, Error)]
pub enum GateError {
    /// Persisted store failed or timed out. Decisions fall back to Redirect.
    #[error("Auth state store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// An asynchronous read resolved after a later auth transition.
    #[error("Stale decision: observed epoch {observed_epoch}, current epoch {current_epoch}")]
    StaleDecision {
        observed_epoch: u64,
        current_epoch: u64,
    },

    /// Session closed while its decision was in flight. Dropped silently.
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Incorrect password!")]
    CredentialMismatch,

    #[error("{0}")]
    InvalidSecretChange(SecretChangeRejection),

    #[error("Gate is not initialized yet")]
    NotInitialized,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Session navigator error: {0}")]
    Navigator(#[from] NavigatorError),
}

/// Errors from the persisted key-value store (driven port)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Malformed value for key {key}: {reason}")]
    Decode { key: String, reason: String },
}

/// Errors from the host session navigator (driven port)
#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("Navigator unavailable: {0}")]
    Unavailable(String),

    #[error("Session no longer exists: {0}")]
    SessionGone(SessionId),
}

/// Invalid gate configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("gate_url must not be empty")]
    EmptyGateUrl,

    #[error("default secret must not be empty")]
    EmptyDefaultSecret,

    #[error("store_timeout_ms must be greater than zero")]
    ZeroStoreTimeout,
}
