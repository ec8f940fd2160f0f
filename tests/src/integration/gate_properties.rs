//! # Gate Behavior End to End
//!
//! Every scenario runs through `EventDispatcher` and `ControlHandler` on top
//! of a shared `ChannelNavigator`, the same wiring the runtime uses.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gate_core::domain::{KEY_IS_FIRST_RUN, KEY_IS_LOGGED_IN, KEY_PASSWORD};
    use gate_core::{
        ChannelNavigator, ControlHandler, ControlRequest, ControlResponse, EventDispatcher,
        GateAction, GateApi, GateConfig, GateController, GateDecision, GateEvent, GateState,
        MemoryStateStore, NavigationEvent, NavigationPhase, SessionId, SessionNavigator,
    };
    use serde_json::json;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Gate = GateController<MemoryStateStore>;

    struct Harness {
        store: Arc<MemoryStateStore>,
        gate: Arc<Gate>,
        navigator: Arc<ChannelNavigator>,
        dispatcher: EventDispatcher<Gate, ChannelNavigator>,
        control: ControlHandler<Gate, ChannelNavigator>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_store(Arc::new(MemoryStateStore::new()))
        }

        fn with_store(store: Arc<MemoryStateStore>) -> Self {
            let config = GateConfig::default();
            let gate = Arc::new(GateController::with_config(
                Arc::clone(&store),
                config.clone(),
            ));
            let navigator = Arc::new(ChannelNavigator::new());
            let dispatcher =
                EventDispatcher::new(Arc::clone(&gate), Arc::clone(&navigator), config.clone());
            let control = ControlHandler::new(Arc::clone(&gate), Arc::clone(&navigator), config);
            Self {
                store,
                gate,
                navigator,
                dispatcher,
                control,
            }
        }

        /// Feed an event the way the runtime bridge does
        async fn send(&self, event: GateEvent) -> Vec<GateAction> {
            self.navigator.observe(&event);
            self.dispatcher.dispatch(event).await
        }

        async fn navigate(&self, session: u64, url: &str) -> Vec<GateAction> {
            self.send(GateEvent::NavigationBegin {
                session_id: SessionId(session),
                url: url.to_string(),
                is_main_frame: true,
            })
            .await
        }

        async fn login(&self, password: &str) -> ControlResponse {
            self.control
                .handle(ControlRequest::Login {
                    password: password.to_string(),
                })
                .await
        }

        async fn decide(&self, session: u64, url: &str) -> GateDecision {
            let event =
                NavigationEvent::new(SessionId(session), url, NavigationPhase::Activated);
            self.gate.decide(&event).await
        }

        fn gate_url(&self) -> String {
            self.gate.config().gate_url.clone()
        }
    }

    fn redirect(session: u64, url: &str) -> GateAction {
        GateAction::RedirectSession {
            session_id: SessionId(session),
            url: url.to_string(),
        }
    }

    // =============================================================================
    // READINESS
    // =============================================================================

    /// Nothing gets through before the first startup trigger.
    #[tokio::test]
    async fn test_no_allow_before_initialize() {
        let h = Harness::new();

        for (session, url) in [
            (1, "https://example.com"),
            (2, "http://intranet.test/login"),
            (1, "https://example.com/again"),
        ] {
            let actions = h.navigate(session, url).await;
            assert_eq!(actions, vec![redirect(session, &h.gate_url())]);
        }
        assert!(h.decide(3, "https://bank.example").await.is_redirect());
        assert!(matches!(
            h.login("Au").await,
            ControlResponse::Error { .. }
        ));
        assert_eq!(h.gate.state().await, GateState::Locked { ready: false });
    }

    /// Fresh store: defaults are seeded and the first navigation is held.
    #[tokio::test]
    async fn test_fresh_store_scenario() {
        let h = Harness::new();

        h.send(GateEvent::ProcessStart).await;

        let values = h.store.snapshot().await;
        assert_eq!(values.get(KEY_IS_FIRST_RUN), Some(&json!(false)));
        assert_eq!(values.get(KEY_PASSWORD), Some(&json!("Au")));
        assert_eq!(values.get(KEY_IS_LOGGED_IN), Some(&json!(false)));

        let actions = h.navigate(1, "https://example.com").await;
        assert_eq!(actions, vec![redirect(1, &h.gate_url())]);
    }

    // =============================================================================
    // LOGIN / LOGOUT
    // =============================================================================

    /// Default secret unlocks; the same session is then allowed.
    #[tokio::test]
    async fn test_default_secret_unlocks_same_session() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        h.navigate(1, "https://example.com").await;

        assert!(matches!(
            h.login("Au").await,
            ControlResponse::Authorized { .. }
        ));

        assert_eq!(h.decide(1, "https://example.com").await, GateDecision::Allow);
        assert!(h.navigate(1, "https://example.com/next").await.is_empty());
        assert!(h.gate.exempt_sessions().await.is_empty());
        assert_eq!(h.gate.state().await, GateState::Unlocked);
    }

    /// A and B held at the gate are released by a login from a third session.
    #[tokio::test]
    async fn test_login_releases_every_held_session() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        h.navigate(1, "https://a.example").await;
        h.navigate(2, "https://b.example").await;
        h.navigate(3, "https://c.example").await;

        let released = match h.login("Au").await {
            ControlResponse::Authorized { released } => released,
            other => panic!("expected authorized, got {other:?}"),
        };

        assert_eq!(released.len(), 3);
        assert_eq!(h.decide(1, "https://a.example").await, GateDecision::Allow);
        assert_eq!(h.decide(2, "https://b.example").await, GateDecision::Allow);
        // Released sessions are sent back where they were going.
        assert_eq!(
            h.navigator.session_url_now(SessionId(1)).as_deref(),
            Some("https://a.example")
        );
        assert_eq!(
            h.navigator.session_url_now(SessionId(2)).as_deref(),
            Some("https://b.example")
        );
    }

    #[tokio::test]
    async fn test_wrong_secret_changes_nothing() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        h.navigate(1, "https://a.example").await;
        let store_before = h.store.snapshot().await;
        let epoch_before = h.gate.epoch().await;

        assert_eq!(
            h.login("au").await,
            ControlResponse::Denied {
                message: "Incorrect password!".to_string()
            }
        );

        assert_eq!(h.store.snapshot().await, store_before);
        assert_eq!(h.gate.epoch().await, epoch_before);
        assert_eq!(h.gate.exempt_sessions().await, vec![SessionId(1)]);
        assert_eq!(h.gate.state().await, GateState::Locked { ready: true });
    }

    #[tokio::test]
    async fn test_logout_relocks_and_redirects() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        h.login("Au").await;
        h.navigate(4, "https://mail.example").await;

        assert_eq!(
            h.control.handle(ControlRequest::Logout).await,
            ControlResponse::LoggedOut
        );

        assert_eq!(h.gate.state().await, GateState::Locked { ready: true });
        assert_eq!(h.navigator.session_url_now(SessionId(4)), Some(h.gate_url()));
        assert!(h.decide(5, "https://news.example").await.is_redirect());
    }

    #[tokio::test]
    async fn test_secret_change_applies_to_next_login() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        h.login("Au").await;

        assert_eq!(
            h.control
                .handle(ControlRequest::ChangePassword {
                    new_password: "open sesame".into(),
                    confirm_password: "open sesame".into(),
                })
                .await,
            ControlResponse::SecretChanged
        );
        assert!(h.gate.is_logged_in().await);

        h.control.handle(ControlRequest::Logout).await;
        assert!(matches!(h.login("Au").await, ControlResponse::Denied { .. }));
        assert!(matches!(
            h.login("open sesame").await,
            ControlResponse::Authorized { .. }
        ));
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_all_sessions_closed_only_locks_when_none_remain() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        h.login("Au").await;
        h.send(GateEvent::SessionCreated {
            session_id: SessionId(1),
            url: "https://a.example".into(),
        })
        .await;
        h.send(GateEvent::SessionCreated {
            session_id: SessionId(2),
            url: "https://b.example".into(),
        })
        .await;

        h.send(GateEvent::SessionClosed {
            session_id: SessionId(1),
        })
        .await;
        h.send(GateEvent::AllSessionsClosed).await;
        assert!(h.gate.is_logged_in().await);

        // Closes the last one (the gate tab opened at startup included).
        for session in h.navigator.list_sessions().await.unwrap() {
            h.send(GateEvent::SessionClosed {
                session_id: session.id,
            })
            .await;
        }
        h.send(GateEvent::AllSessionsClosed).await;
        assert!(!h.gate.is_logged_in().await);
        assert_eq!(h.store.snapshot().await.get(KEY_IS_LOGGED_IN), Some(&json!(false)));
    }

    /// Events run on their own tasks, so a close can finish before an
    /// earlier navigation of the same session is decided.
    #[tokio::test]
    async fn test_closed_sessions_do_not_accumulate_exemptions() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;

        for session in 1..=50 {
            let navigation = GateEvent::NavigationBegin {
                session_id: SessionId(session),
                url: format!("https://site{session}.example"),
                is_main_frame: true,
            };
            let close = GateEvent::SessionClosed {
                session_id: SessionId(session),
            };
            h.navigator.observe(&navigation);
            h.navigator.observe(&close);

            h.dispatcher.dispatch(close).await;
            assert!(h.dispatcher.dispatch(navigation).await.is_empty());
        }

        assert!(h.gate.exempt_sessions().await.is_empty());
        assert_eq!(h.navigator.session_count(), 1);
    }

    #[tokio::test]
    async fn test_browser_restart_locks() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        h.login("Au").await;

        h.send(GateEvent::BrowserStart).await;

        assert!(!h.gate.is_logged_in().await);
        assert_eq!(h.gate.state().await, GateState::Locked { ready: true });
    }

    /// A new process over the same persisted state starts locked.
    #[tokio::test]
    async fn test_process_restart_locks() {
        let store = Arc::new(MemoryStateStore::new());
        let first = Harness::with_store(Arc::clone(&store));
        first.send(GateEvent::ProcessStart).await;
        first.login("Au").await;
        assert_eq!(store.snapshot().await.get(KEY_IS_LOGGED_IN), Some(&json!(true)));

        let second = Harness::with_store(Arc::clone(&store));
        second.send(GateEvent::ProcessStart).await;

        assert!(!second.gate.is_logged_in().await);
        assert_eq!(store.snapshot().await.get(KEY_IS_LOGGED_IN), Some(&json!(false)));
        assert!(second.decide(1, "https://a.example").await.is_redirect());
    }

    /// The gate page itself is never redirected, and a held session is not
    /// redirected twice.
    #[tokio::test]
    async fn test_gate_page_is_not_redirected() {
        let h = Harness::new();
        h.send(GateEvent::ProcessStart).await;
        let gate_url = h.gate_url();

        assert!(h
            .send(GateEvent::SessionCreated {
                session_id: SessionId(8),
                url: gate_url.clone(),
            })
            .await
            .is_empty());

        assert_eq!(h.navigate(9, "https://a.example").await.len(), 1);
        assert!(h
            .send(GateEvent::SessionActivated {
                session_id: SessionId(9)
            })
            .await
            .is_empty());
    }
}
