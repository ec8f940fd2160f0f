//! Inbound Ports (Driving Ports)
//!
//! The API external components use to drive the gate.

use async_trait::async_trait;

use crate::domain::{GateDecision, GateState, LoginOutcome, NavigationEvent, SessionId};
use crate::error::GateResult;

/// Primary gate API (Driving Port)
///
/// All mutations are serialized by the implementation; callers may invoke
/// any method concurrently.
#[async_trait]
pub trait GateApi: Send + Sync {
    /// Establish readiness and force the locked state.
    ///
    /// On first run also seeds the default secret. Idempotent.
    async fn initialize(&self) -> GateResult<()>;

    /// Allow or redirect. Never fails: any error resolves to Redirect.
    async fn decide(&self, event: &NavigationEvent) -> GateDecision;

    /// Compare a candidate against the stored secret.
    ///
    /// No retry counter and no backoff.
    async fn login(&self, candidate: &str) -> GateResult<LoginOutcome>;

    /// Lock the gate and clear every exemption.
    async fn logout(&self) -> GateResult<()>;

    /// Replace the stored secret. Only while unlocked.
    async fn change_secret(&self, new_secret: &str, confirmation: &str) -> GateResult<()>;

    async fn is_logged_in(&self) -> bool;

    /// Drop a closed session from the exemption registry.
    async fn forget_session(&self, session_id: SessionId) -> bool;

    async fn state(&self) -> GateState;
}
