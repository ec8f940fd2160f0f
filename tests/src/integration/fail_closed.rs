//! # Fail-Closed Behavior
//!
//! A scripted store that can fail, hang, or hold a read until released.
//! Whatever the store does, no decision turns into an Allow it should not
//! be.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use gate_core::domain::{StoreMap, KEY_IS_LOGGED_IN};
    use gate_core::ports::StoreResult;
    use gate_core::{
        AuthStateStore, ChannelNavigator, EventDispatcher, GateApi, GateConfig, GateController,
        GateEvent, GateState, MemoryStateStore, NavigationEvent, NavigationPhase, SessionId,
        StoreError,
    };
    use tokio::sync::Notify;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Mode {
        Normal,
        Fail,
        /// Auth-status reads never complete
        Hang,
        /// Auth-status reads wait for `release`
        Hold,
    }

    struct ScriptedStore {
        inner: MemoryStateStore,
        mode: Mutex<Mode>,
        held: Notify,
        release: Notify,
    }

    impl ScriptedStore {
        fn new() -> Self {
            Self {
                inner: MemoryStateStore::new(),
                mode: Mutex::new(Mode::Normal),
                held: Notify::new(),
                release: Notify::new(),
            }
        }

        fn set_mode(&self, mode: Mode) {
            *self.mode.lock().unwrap() = mode;
        }

        fn mode(&self) -> Mode {
            *self.mode.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl AuthStateStore for ScriptedStore {
        async fn get(&self, keys: &[&str]) -> StoreResult<StoreMap> {
            let status_read = keys.contains(&KEY_IS_LOGGED_IN);
            match self.mode() {
                Mode::Fail => Err(StoreError::Backend("scripted failure".into())),
                Mode::Hang if status_read => std::future::pending().await,
                Mode::Hold if status_read => {
                    let values = self.inner.get(keys).await;
                    self.held.notify_one();
                    self.release.notified().await;
                    values
                }
                _ => self.inner.get(keys).await,
            }
        }

        async fn set(&self, values: StoreMap) -> StoreResult<()> {
            if self.mode() == Mode::Fail {
                return Err(StoreError::Backend("scripted failure".into()));
            }
            self.inner.set(values).await
        }
    }

    fn nav(session: u64, url: &str) -> NavigationEvent {
        NavigationEvent::new(SessionId(session), url, NavigationPhase::BeforeNavigate)
    }

    async fn unlocked(config: GateConfig) -> (Arc<ScriptedStore>, Arc<GateController<ScriptedStore>>) {
        let store = Arc::new(ScriptedStore::new());
        let gate = Arc::new(GateController::with_config(Arc::clone(&store), config));
        gate.initialize().await.unwrap();
        assert!(gate.login("Au").await.unwrap().is_authorized());
        (store, gate)
    }

    // =============================================================================
    // STORE FAILURES
    // =============================================================================

    #[tokio::test]
    async fn test_failing_store_at_startup_keeps_gate_not_ready() {
        let store = Arc::new(ScriptedStore::new());
        store.set_mode(Mode::Fail);
        let gate = Arc::new(GateController::new(Arc::clone(&store)));
        let navigator = Arc::new(ChannelNavigator::new());
        let dispatcher =
            EventDispatcher::new(Arc::clone(&gate), Arc::clone(&navigator), GateConfig::default());

        dispatcher.dispatch(GateEvent::ProcessStart).await;
        assert_eq!(gate.state().await, GateState::Locked { ready: false });

        let first = GateEvent::NetworkRequest {
            session_id: SessionId(1),
            url: "https://a.example".into(),
        };
        navigator.observe(&first);
        let held = dispatcher.dispatch(first).await;
        assert_eq!(held.len(), 1);

        // Store back: the next event completes the startup.
        store.set_mode(Mode::Normal);
        let second = GateEvent::NetworkRequest {
            session_id: SessionId(2),
            url: "https://b.example".into(),
        };
        navigator.observe(&second);
        dispatcher.dispatch(second).await;
        assert_eq!(gate.state().await, GateState::Locked { ready: true });
    }

    #[tokio::test]
    async fn test_failing_store_while_unlocked_redirects() {
        let (store, gate) = unlocked(GateConfig::default()).await;
        store.set_mode(Mode::Fail);

        assert!(gate.decide(&nav(1, "https://a.example")).await.is_redirect());

        store.set_mode(Mode::Normal);
        assert!(gate.decide(&nav(1, "https://a.example")).await.is_allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_store_redirects_after_timeout() {
        let config = GateConfig::default().with_store_timeout(Duration::from_millis(250));
        let (store, gate) = unlocked(config).await;
        store.set_mode(Mode::Hang);

        let started = tokio::time::Instant::now();
        let decision = gate.decide(&nav(1, "https://a.example")).await;

        assert!(decision.is_redirect());
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert_eq!(gate.metrics().snapshot().decisions_failed_closed, 1);
    }

    // =============================================================================
    // STALE READS
    // =============================================================================

    /// A read that was in flight across a logout must not allow.
    #[tokio::test]
    async fn test_read_across_logout_is_discarded() {
        let (store, gate) = unlocked(GateConfig::default()).await;
        store.set_mode(Mode::Hold);

        let pending = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.decide(&nav(1, "https://a.example")).await })
        };
        store.held.notified().await;
        store.set_mode(Mode::Normal);
        gate.logout().await.unwrap();
        store.release.notify_one();

        assert!(pending.await.unwrap().is_redirect());
        assert!(gate.is_exempt(SessionId(1)).await);
        assert_eq!(gate.metrics().snapshot().stale_retries, 1);
    }

    /// Without retries left, a stale read fails closed.
    #[tokio::test]
    async fn test_stale_read_without_retries_fails_closed() {
        let config = GateConfig {
            max_stale_retries: 0,
            ..Default::default()
        };
        let (store, gate) = unlocked(config).await;
        store.set_mode(Mode::Hold);

        let pending = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.decide(&nav(1, "https://a.example")).await })
        };
        store.held.notified().await;
        store.set_mode(Mode::Normal);
        // Log out and back in: the gate ends unlocked, but in a new epoch.
        gate.logout().await.unwrap();
        assert!(gate.login("Au").await.unwrap().is_authorized());
        store.release.notify_one();

        assert!(pending.await.unwrap().is_redirect());
        let metrics = gate.metrics().snapshot();
        assert_eq!(metrics.stale_retries, 1);
        assert_eq!(metrics.decisions_failed_closed, 1);
        assert!(!gate.is_exempt(SessionId(1)).await);
    }
}
