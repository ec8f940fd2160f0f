//! Outbound Ports (Driven Ports)
//!
//! Dependencies the gate needs from its host: a persisted key-value store
//! and a way to inspect and steer browsing sessions.

use async_trait::async_trait;

use crate::domain::{SessionId, SessionInfo, StoreMap};
use crate::error::{NavigatorError, StoreError};
use crate::events::GateAction;

pub type StoreResult<T> = Result<T, StoreError>;
pub type NavigatorResult<T> = Result<T, NavigatorError>;

/// Persisted auth state store (Driven Port)
///
/// Keys: `isLoggedIn` (bool), `isFirstRun` (bool), `password` (string).
/// Absent keys are simply missing from the returned map.
#[async_trait]
pub trait AuthStateStore: Send + Sync {
    async fn get(&self, keys: &[&str]) -> StoreResult<StoreMap>;

    /// Merge the given entries into the store
    async fn set(&self, values: StoreMap) -> StoreResult<()>;
}

/// Host session navigator (Driven Port)
///
/// The browser-specific redirect mechanism lives behind this trait.
#[async_trait]
pub trait SessionNavigator: Send + Sync {
    async fn list_sessions(&self) -> NavigatorResult<Vec<SessionInfo>>;

    /// Current URL of a session, `None` if it no longer exists
    async fn session_url(&self, session_id: SessionId) -> NavigatorResult<Option<String>>;

    /// Number of open browser windows
    async fn open_window_count(&self) -> NavigatorResult<usize>;

    async fn apply(&self, action: GateAction) -> NavigatorResult<()>;
}
