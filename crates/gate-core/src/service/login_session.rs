//! Login Session
//!
//! Drives the credential-entry flow on top of the gate. A successful login
//! releases every session that was held at the gate without waiting for it
//! to navigate again.

use std::sync::Arc;
use tracing::{debug, info};

use super::reevaluate::{apply_actions, reevaluate_sessions};
use crate::config::GateConfig;
use crate::domain::{is_internal_url, LoginOutcome, NavigationEvent, NavigationPhase};
use crate::error::GateResult;
use crate::events::GateAction;
use crate::ports::{GateApi, SessionNavigator};

/// Result of a login attempt together with the host actions it caused
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginReport {
    pub outcome: LoginOutcome,
    pub actions: Vec<GateAction>,
}

pub struct LoginSession<G: ?Sized, N: ?Sized> {
    gate: Arc<G>,
    navigator: Arc<N>,
    config: GateConfig,
}

impl<G, N> LoginSession<G, N>
where
    G: GateApi + ?Sized,
    N: SessionNavigator + ?Sized,
{
    pub fn new(gate: Arc<G>, navigator: Arc<N>, config: GateConfig) -> Self {
        Self {
            gate,
            navigator,
            config,
        }
    }

    /// Submit a candidate secret.
    ///
    /// On success each released session is decided again; with
    /// `restore_after_login` it is also sent back to the page it was
    /// blocked on.
    pub async fn submit(&self, candidate: &str) -> GateResult<LoginReport> {
        let outcome = self.gate.login(candidate).await?;
        let released = match &outcome {
            LoginOutcome::Authorized { released } => released.clone(),
            LoginOutcome::Denied => {
                return Ok(LoginReport {
                    outcome,
                    actions: Vec::new(),
                })
            }
        };

        let mut actions = Vec::new();
        for entry in &released {
            let current_url = match self.navigator.session_url(entry.session_id).await {
                Ok(Some(url)) => url,
                // Closed since it was blocked.
                Ok(None) => continue,
                Err(e) => {
                    debug!(session_id = %entry.session_id, error = %e, "Released session not reachable");
                    continue;
                }
            };

            let event =
                NavigationEvent::new(entry.session_id, current_url, NavigationPhase::Complete);
            let decision = self.gate.decide(&event).await;
            if !decision.is_allow() {
                continue;
            }

            if !self.config.restore_after_login {
                continue;
            }
            if let Some(blocked_url) = entry
                .blocked_url
                .as_ref()
                .filter(|url| !is_internal_url(url, &self.config))
            {
                actions.push(GateAction::RedirectSession {
                    session_id: entry.session_id,
                    url: blocked_url.clone(),
                });
            }
        }

        apply_actions(self.navigator.as_ref(), &actions).await;
        info!(
            released = released.len(),
            restored = actions.len(),
            "Blocked sessions released"
        );
        Ok(LoginReport { outcome, actions })
    }

    /// Lock the gate and send every open session back to it.
    ///
    /// The sweep runs even when the logout could not be persisted, since
    /// the gate is already locked in memory.
    pub async fn sign_out(&self) -> GateResult<Vec<GateAction>> {
        let logout = self.gate.logout().await;
        let actions =
            reevaluate_sessions(self.gate.as_ref(), self.navigator.as_ref(), &self.config).await?;
        apply_actions(self.navigator.as_ref(), &actions).await;
        logout.map(|_| actions)
    }
}
