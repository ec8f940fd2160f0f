//! Session re-evaluation shared by the dispatcher and the login flow

use tracing::{debug, warn};

use crate::config::GateConfig;
use crate::domain::{is_internal_url, GateDecision, NavigationEvent, NavigationPhase, SessionId};
use crate::error::{GateError, GateResult, NavigatorError};
use crate::events::GateAction;
use crate::ports::{GateApi, SessionNavigator};

/// Turn a decision into the host action it requires, if any.
///
/// A session already showing an internal page is never redirected, even
/// while the gate is not ready.
pub fn redirect_action(
    session_id: SessionId,
    current_url: &str,
    decision: &GateDecision,
    config: &GateConfig,
) -> Option<GateAction> {
    match decision {
        GateDecision::Allow => None,
        GateDecision::Redirect(_) if is_internal_url(current_url, config) => None,
        GateDecision::Redirect(gate_url) => Some(GateAction::RedirectSession {
            session_id,
            url: gate_url.clone(),
        }),
    }
}

/// Decide every open session again against the current auth state.
///
/// With no session open and `open_gate_when_idle` set, the gate UI is
/// opened instead.
pub async fn reevaluate_sessions<G, N>(
    gate: &G,
    navigator: &N,
    config: &GateConfig,
) -> GateResult<Vec<GateAction>>
where
    G: GateApi + ?Sized,
    N: SessionNavigator + ?Sized,
{
    let sessions = navigator.list_sessions().await?;
    if sessions.is_empty() {
        if config.open_gate_when_idle && !gate.is_logged_in().await {
            return Ok(vec![GateAction::OpenSession {
                url: config.gate_url.clone(),
            }]);
        }
        return Ok(Vec::new());
    }

    let mut actions = Vec::new();
    for session in sessions {
        let event = NavigationEvent::new(session.id, session.url.clone(), NavigationPhase::Complete);
        let decision = gate.decide(&event).await;
        if let Some(action) = redirect_action(session.id, &session.url, &decision, config) {
            actions.push(action);
        }
    }
    debug!(redirects = actions.len(), "Sessions re-evaluated");
    Ok(actions)
}

/// Hand actions to the host. A session that vanished meanwhile is skipped.
pub async fn apply_actions<N>(navigator: &N, actions: &[GateAction])
where
    N: SessionNavigator + ?Sized,
{
    for action in actions {
        match navigator.apply(action.clone()).await {
            Ok(()) => {}
            Err(NavigatorError::SessionGone(session_id)) => {
                debug!(error = %GateError::UnknownSession(session_id), "Action dropped");
            }
            Err(e) => warn!(error = %e, url = action.url(), "Host action not applied"),
        }
    }
}
