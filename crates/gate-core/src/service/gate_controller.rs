//! Gate Controller
//!
//! Owns the in-memory mirror of the auth state and the session exemption
//! registry, and serializes every transition through a single async lock.
//!
//! ## Concurrency
//!
//! - `initialize`, `login`, `logout` and `change_secret` hold the lock for
//!   their whole store round trip, so they never interleave partially.
//! - `decide` never holds the lock across I/O. It records the auth epoch,
//!   confirms an unlocked gate against the store, then re-acquires the lock
//!   and re-validates the epoch before acting. A read that raced a
//!   transition is discarded and the decision is taken again.
//! - Any store failure or timeout resolves the decision to Redirect.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GateConfig;
use crate::domain::{
    evaluate, is_internal_url, read_bool, read_string, validate_secret_change, AuthEpoch, AuthState,
    CredentialSecret, DecisionSnapshot, GateDecision, GateState, GateTransition, LoginOutcome,
    NavigationEvent, SessionId, SessionRegistry, StoreMap, KEY_IS_FIRST_RUN, KEY_IS_LOGGED_IN,
    KEY_PASSWORD,
};
use crate::error::{GateError, GateResult, StoreError};
use crate::metrics::GateMetrics;
use crate::ports::{AuthStateStore, GateApi};

/// Everything guarded by the controller lock
#[derive(Debug, Default)]
struct ControllerState {
    auth: AuthState,
    gate: GateState,
    exempt: SessionRegistry,
    epoch: AuthEpoch,
}

impl ControllerState {
    fn step(&mut self, input: GateTransition) {
        self.gate = self.gate.transition(input);
        debug_assert_eq!(self.gate, self.auth.gate_state());
    }

    /// Lock the gate and start a new auth epoch. Returns the number of
    /// exemptions dropped.
    fn relock(&mut self) -> usize {
        self.auth.is_logged_in = false;
        self.step(GateTransition::Logout);
        self.epoch += 1;
        self.exempt.drain().len()
    }
}

/// What the first pass of a decision found under the lock
enum FirstPass {
    Done(GateDecision),
    ConfirmUnlocked { observed_epoch: AuthEpoch },
}

/// Gate controller implementation
///
/// Implements the `GateApi` port on top of an injected `AuthStateStore`.
pub struct GateController<S: AuthStateStore> {
    config: GateConfig,
    store: Arc<S>,
    state: Mutex<ControllerState>,
    metrics: Arc<GateMetrics>,
}

impl<S: AuthStateStore> GateController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, GateConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: GateConfig) -> Self {
        Self {
            config,
            store,
            state: Mutex::new(ControllerState::default()),
            metrics: Arc::new(GateMetrics::new()),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<GateMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.auth.initialized
    }

    pub async fn epoch(&self) -> AuthEpoch {
        self.state.lock().await.epoch
    }

    /// Sessions currently exempt from redirection, ordered by id
    pub async fn exempt_sessions(&self) -> Vec<SessionId> {
        self.state.lock().await.exempt.ids()
    }

    pub async fn is_exempt(&self, session_id: SessionId) -> bool {
        self.state.lock().await.exempt.contains(session_id)
    }

    async fn store_get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        let timeout = self.config.store_timeout();
        let result = match tokio::time::timeout(timeout, self.store.get(keys)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                timeout_ms: self.config.store_timeout_ms,
            }),
        };
        if result.is_err() {
            self.metrics.record_store_failure();
        }
        result
    }

    async fn store_set(&self, values: StoreMap) -> Result<(), StoreError> {
        let timeout = self.config.store_timeout();
        let result = match tokio::time::timeout(timeout, self.store.set(values)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                timeout_ms: self.config.store_timeout_ms,
            }),
        };
        if result.is_err() {
            self.metrics.record_store_failure();
        }
        result
    }

    fn redirect(&self) -> GateDecision {
        GateDecision::Redirect(self.config.gate_url.clone())
    }

    /// Evaluate the policy against a locked snapshot and apply its side
    /// effect (exempting the session) in the same critical section.
    fn conclude(
        &self,
        state: &mut ControllerState,
        event: &NavigationEvent,
        logged_in: bool,
    ) -> GateDecision {
        let snapshot = DecisionSnapshot {
            initialized: state.auth.initialized,
            logged_in,
            exempt: state.exempt.contains(event.session_id),
        };
        let verdict = evaluate(snapshot, &event.url, &self.config);
        if verdict.exempts_session() {
            let blocked_url = (!event.url.is_empty()).then(|| event.url.clone());
            state.exempt.add(event.session_id, blocked_url);
        }
        self.metrics.record_verdict(verdict);

        debug!(
            session_id = %event.session_id,
            url = %event.url,
            phase = event.phase.as_str(),
            epoch = state.epoch,
            verdict = verdict.as_str(),
            "Gate decision"
        );

        if verdict.is_allow() {
            GateDecision::Allow
        } else {
            self.redirect()
        }
    }

    async fn first_pass(&self, event: &NavigationEvent) -> FirstPass {
        let mut state = self.state.lock().await;
        if state.auth.initialized && state.auth.is_logged_in {
            // Internal URLs need no confirmation round trip.
            if is_internal_url(&event.url, &self.config) {
                return FirstPass::Done(self.conclude(&mut state, event, true));
            }
            return FirstPass::ConfirmUnlocked {
                observed_epoch: state.epoch,
            };
        }
        FirstPass::Done(self.conclude(&mut state, event, false))
    }

    async fn decide_inner(&self, event: &NavigationEvent) -> GateDecision {
        let decision_id = Uuid::new_v4();
        let max_attempts = self.config.max_stale_retries.saturating_add(1);

        for attempt in 0..max_attempts {
            let observed_epoch = match self.first_pass(event).await {
                FirstPass::Done(decision) => return decision,
                FirstPass::ConfirmUnlocked { observed_epoch } => observed_epoch,
            };

            let store_logged_in = match self.store_get(&[KEY_IS_LOGGED_IN]).await {
                Ok(values) => read_bool(&values, KEY_IS_LOGGED_IN),
                Err(e) => Err(e),
            };
            let store_logged_in = match store_logged_in {
                Ok(value) => value.unwrap_or(false),
                Err(e) => {
                    warn!(
                        %decision_id,
                        session_id = %event.session_id,
                        error = %GateError::StoreUnavailable(e),
                        "Failing closed"
                    );
                    self.metrics.record_fail_closed();
                    return self.redirect();
                }
            };

            let mut state = self.state.lock().await;
            if state.epoch != observed_epoch {
                let stale = GateError::StaleDecision {
                    observed_epoch,
                    current_epoch: state.epoch,
                };
                debug!(%decision_id, attempt, error = %stale, "Re-deciding");
                self.metrics.record_stale_retry();
                continue;
            }

            if !store_logged_in && state.auth.is_logged_in {
                let dropped = state.relock();
                info!(
                    epoch = state.epoch,
                    dropped_exemptions = dropped,
                    "Store reports logged out, relocking"
                );
                self.metrics.record_logout();
            }
            let logged_in = state.auth.is_logged_in && store_logged_in;
            return self.conclude(&mut state, event, logged_in);
        }

        warn!(
            %decision_id,
            session_id = %event.session_id,
            attempts = max_attempts,
            "Auth state kept changing during decision, failing closed"
        );
        self.metrics.record_fail_closed();
        self.redirect()
    }
}

#[async_trait]
impl<S: AuthStateStore + 'static> GateApi for GateController<S> {
    async fn initialize(&self) -> GateResult<()> {
        let mut state = self.state.lock().await;
        let was_unlocked = state.auth.is_logged_in;
        let dropped = state.relock();

        let existing = self.store_get(&[KEY_IS_FIRST_RUN, KEY_PASSWORD]).await?;
        let first_run = read_bool(&existing, KEY_IS_FIRST_RUN)?.is_none();
        let stored_secret = read_string(&existing, KEY_PASSWORD)?;

        let mut values = StoreMap::new();
        values.insert(KEY_IS_LOGGED_IN.to_string(), Value::Bool(false));

        match (first_run, stored_secret) {
            (false, Some(_)) => {}
            (first_run, _) => {
                if !first_run {
                    warn!("Stored secret missing, reseeding the default");
                }
                values.insert(KEY_IS_FIRST_RUN.to_string(), Value::Bool(false));
                values.insert(
                    KEY_PASSWORD.to_string(),
                    Value::String(self.config.default_secret.clone()),
                );
            }
        }

        self.store_set(values).await?;

        state.auth.initialized = true;
        state.step(GateTransition::Initialize);

        info!(
            first_run,
            was_unlocked,
            dropped_exemptions = dropped,
            epoch = state.epoch,
            "Gate initialized (locked)"
        );
        Ok(())
    }

    async fn decide(&self, event: &NavigationEvent) -> GateDecision {
        self.decide_inner(event).await
    }

    async fn login(&self, candidate: &str) -> GateResult<LoginOutcome> {
        let mut state = self.state.lock().await;
        if !state.auth.initialized {
            return Err(GateError::NotInitialized);
        }

        let values = self.store_get(&[KEY_PASSWORD]).await?;
        let matched = read_string(&values, KEY_PASSWORD)?
            .map(CredentialSecret::new)
            .is_some_and(|secret| secret.matches(candidate));
        if !matched {
            self.metrics.record_login(false, 0);
            info!(epoch = state.epoch, "Login denied");
            return Ok(LoginOutcome::Denied);
        }

        let mut values = StoreMap::new();
        values.insert(KEY_IS_LOGGED_IN.to_string(), Value::Bool(true));
        self.store_set(values).await?;

        state.auth.is_logged_in = true;
        state.step(GateTransition::LoginSucceeded);
        state.epoch += 1;
        let released = state.exempt.drain();

        self.metrics.record_login(true, released.len());
        info!(
            epoch = state.epoch,
            released = released.len(),
            "Login authorized, gate unlocked"
        );
        Ok(LoginOutcome::Authorized { released })
    }

    async fn logout(&self) -> GateResult<()> {
        let mut state = self.state.lock().await;
        let was_unlocked = state.auth.is_logged_in;
        let dropped = state.relock();
        self.metrics.record_logout();

        info!(
            was_unlocked,
            dropped_exemptions = dropped,
            epoch = state.epoch,
            "Gate locked"
        );

        let mut values = StoreMap::new();
        values.insert(KEY_IS_LOGGED_IN.to_string(), Value::Bool(false));
        if let Err(e) = self.store_set(values).await {
            warn!(error = %e, "Could not persist logout; gate stays locked in memory");
            return Err(e.into());
        }
        Ok(())
    }

    async fn change_secret(&self, new_secret: &str, confirmation: &str) -> GateResult<()> {
        let mut state = self.state.lock().await;
        validate_secret_change(
            state.auth.is_logged_in,
            new_secret,
            confirmation,
            self.config.min_secret_len,
        )
        .map_err(GateError::InvalidSecretChange)?;

        let mut values = StoreMap::new();
        values.insert(
            KEY_PASSWORD.to_string(),
            Value::String(new_secret.to_string()),
        );
        self.store_set(values).await?;

        info!(epoch = state.epoch, "Secret changed");
        Ok(())
    }

    async fn is_logged_in(&self) -> bool {
        let state = self.state.lock().await;
        state.auth.initialized && state.auth.is_logged_in
    }

    async fn forget_session(&self, session_id: SessionId) -> bool {
        let removed = self.state.lock().await.exempt.remove(session_id);
        if removed {
            debug!(%session_id, "Exemption removed");
        }
        removed
    }

    async fn state(&self) -> GateState {
        self.state.lock().await.gate
    }
}
