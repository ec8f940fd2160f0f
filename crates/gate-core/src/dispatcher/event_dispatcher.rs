//! Event Dispatcher
//!
//! Normalizes host triggers into gate calls. Every event maps onto exactly
//! one controller or registry operation; the host actions that follow are
//! applied through the navigator and returned to the caller.

use gate_telemetry::log_session_event;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::GateConfig;
use crate::domain::{is_guarded_scheme, NavigationEvent, NavigationPhase, SessionId};
use crate::error::GateError;
use crate::events::{GateAction, GateEvent};
use crate::ports::{GateApi, SessionNavigator};
use crate::service::{apply_actions, redirect_action, reevaluate_sessions};

pub struct EventDispatcher<G: ?Sized, N: ?Sized> {
    gate: Arc<G>,
    navigator: Arc<N>,
    config: GateConfig,
    /// Set once a startup trigger ran; a failed startup is retried on the
    /// next event
    start_attempted: AtomicBool,
}

impl<G, N> EventDispatcher<G, N>
where
    G: GateApi + ?Sized + 'static,
    N: SessionNavigator + ?Sized + 'static,
{
    pub fn new(gate: Arc<G>, navigator: Arc<N>, config: GateConfig) -> Self {
        Self {
            gate,
            navigator,
            config,
            start_attempted: AtomicBool::new(false),
        }
    }

    pub fn gate(&self) -> &Arc<G> {
        &self.gate
    }

    pub fn navigator(&self) -> &Arc<N> {
        &self.navigator
    }

    /// Process one event on its own task
    pub fn spawn(self: &Arc<Self>, event: GateEvent) -> JoinHandle<Vec<GateAction>> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.dispatch(event).await })
    }

    /// Process one event and return the host actions it produced
    pub async fn dispatch(&self, event: GateEvent) -> Vec<GateAction> {
        let correlation_id = Uuid::new_v4();
        let span = info_span!("gate_event", %correlation_id, event = event.name());
        async move {
            let actions = self.route(event).await;
            apply_actions(self.navigator.as_ref(), &actions).await;
            actions
        }
        .instrument(span)
        .await
    }

    async fn route(&self, event: GateEvent) -> Vec<GateAction> {
        match event {
            GateEvent::ProcessStart | GateEvent::BrowserStart => self.start().await,
            GateEvent::InstalledOrUpdated { reason } => {
                info!(?reason, fresh = reason.is_fresh_install(), "Installed or updated");
                self.start().await
            }
            GateEvent::AllSessionsClosed => {
                self.on_sessions_closed().await;
                Vec::new()
            }
            GateEvent::NavigationBegin {
                session_id,
                url,
                is_main_frame,
            } => {
                if !is_main_frame || !is_guarded_scheme(&url, &self.config) {
                    log_session_event!(
                        debug,
                        "dispatcher",
                        "Navigation not gated",
                        session_id,
                        is_main_frame
                    );
                    return Vec::new();
                }
                self.decide(session_id, url, NavigationPhase::BeforeNavigate)
                    .await
            }
            GateEvent::SessionCreated { session_id, url } => {
                self.decide(session_id, url, NavigationPhase::Created).await
            }
            GateEvent::SessionActivated { session_id } => {
                match self.current_url(session_id).await {
                    Some(url) => self.decide(session_id, url, NavigationPhase::Activated).await,
                    None => Vec::new(),
                }
            }
            GateEvent::SessionUpdated {
                session_id,
                url,
                phase,
            } => {
                if phase != NavigationPhase::Loading {
                    return Vec::new();
                }
                let url = if url.is_empty() {
                    match self.current_url(session_id).await {
                        Some(url) => url,
                        None => return Vec::new(),
                    }
                } else {
                    url
                };
                self.decide(session_id, url, phase).await
            }
            GateEvent::NetworkRequest { session_id, url } => {
                self.decide(session_id, url, NavigationPhase::Request).await
            }
            GateEvent::SessionClosed { session_id } => {
                self.gate.forget_session(session_id).await;
                Vec::new()
            }
        }
    }

    /// Establish readiness, then bring every open session in line
    async fn start(&self) -> Vec<GateAction> {
        self.start_attempted.store(true, Ordering::SeqCst);
        if let Err(e) = self.gate.initialize().await {
            warn!(error = %e, "Initialization failed, gate stays not ready");
        }
        self.reevaluate_all().await
    }

    pub async fn reevaluate_all(&self) -> Vec<GateAction> {
        match reevaluate_sessions(self.gate.as_ref(), self.navigator.as_ref(), &self.config).await
        {
            Ok(actions) => actions,
            Err(e) => {
                warn!(error = %e, "Could not re-evaluate sessions");
                Vec::new()
            }
        }
    }

    /// Retry a failed startup before deciding
    async fn ensure_initialized(&self) {
        if !self.start_attempted.load(Ordering::SeqCst) || self.gate.state().await.is_ready() {
            return;
        }
        match self.gate.initialize().await {
            Ok(()) => info!("Initialization recovered"),
            Err(e) => debug!(error = %e, "Initialization still failing"),
        }
    }

    async fn on_sessions_closed(&self) {
        let remaining = match self.navigator.open_window_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Window count unknown, locking");
                0
            }
        };
        if remaining > 0 {
            debug!(remaining, "Windows still open");
            return;
        }
        if let Err(e) = self.gate.logout().await {
            warn!(error = %e, "Logout after last window closed not persisted");
        }
    }

    async fn current_url(&self, session_id: SessionId) -> Option<String> {
        match self.navigator.session_url(session_id).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                log_session_event!(
                    debug,
                    "dispatcher",
                    "Event dropped",
                    session_id,
                    error = %GateError::UnknownSession(session_id)
                );
                None
            }
            Err(e) => {
                warn!(%session_id, error = %e, "Session URL unavailable");
                None
            }
        }
    }

    async fn decide(
        &self,
        session_id: SessionId,
        url: String,
        phase: NavigationPhase,
    ) -> Vec<GateAction> {
        self.ensure_initialized().await;
        let event = NavigationEvent::new(session_id, url, phase);
        let decision = self.gate.decide(&event).await;
        if decision.is_redirect() && self.session_closed(session_id).await {
            // The close already ran; drop the exemption this decision added.
            self.gate.forget_session(session_id).await;
            log_session_event!(
                debug,
                "dispatcher",
                "Decision dropped",
                session_id,
                error = %GateError::UnknownSession(session_id)
            );
            return Vec::new();
        }
        redirect_action(session_id, &event.url, &decision, &self.config)
            .into_iter()
            .collect()
    }

    /// Whether the navigator no longer knows the session. An unreachable
    /// navigator counts as open so the redirect still goes out.
    async fn session_closed(&self, session_id: SessionId) -> bool {
        matches!(self.navigator.session_url(session_id).await, Ok(None))
    }
}
