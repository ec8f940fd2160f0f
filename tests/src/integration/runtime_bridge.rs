//! # Runtime Bridge
//!
//! Drives `GateRuntime` over in-memory pipes the way a host would: one JSON
//! line in, whatever lines come back out.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use gate_core::domain::{KEY_IS_LOGGED_IN, KEY_PASSWORD};
    use gate_core::{ControlResponse, GateAction, GateApi, SessionId};
    use gate_runtime::{BridgeOutput, GateRuntime, RuntimeConfig};
    use serde_json::{json, Value};
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
    use tokio::task::JoinHandle;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const READ_TIMEOUT: Duration = Duration::from_secs(5);

    struct Host {
        runtime: Arc<GateRuntime>,
        input: Option<DuplexStream>,
        output: Lines<BufReader<DuplexStream>>,
        task: JoinHandle<anyhow::Result<DuplexStream>>,
    }

    impl Host {
        fn start(config: RuntimeConfig) -> Self {
            let runtime = Arc::new(GateRuntime::new(config).unwrap());
            let (input, runtime_input) = duplex(4096);
            let (runtime_output, output) = duplex(4096);

            let task = {
                let runtime = Arc::clone(&runtime);
                tokio::spawn(async move {
                    runtime
                        .run(BufReader::new(runtime_input), runtime_output)
                        .await
                })
            };

            Self {
                runtime,
                input: Some(input),
                output: BufReader::new(output).lines(),
                task,
            }
        }

        async fn send(&mut self, line: Value) {
            let input = self.input.as_mut().unwrap();
            let mut line = line.to_string();
            line.push('\n');
            input.write_all(line.as_bytes()).await.unwrap();
        }

        async fn recv(&mut self) -> BridgeOutput {
            let line = tokio::time::timeout(READ_TIMEOUT, self.output.next_line())
                .await
                .expect("no output in time")
                .unwrap()
                .expect("output closed");
            serde_json::from_str(&line).unwrap()
        }

        async fn recv_n(&mut self, n: usize) -> Vec<BridgeOutput> {
            let mut lines = Vec::with_capacity(n);
            for _ in 0..n {
                lines.push(self.recv().await);
            }
            lines
        }

        /// Close the input and wait for the runtime to drain
        async fn stop(mut self) -> Arc<GateRuntime> {
            drop(self.input.take());
            self.task.await.unwrap().unwrap();
            self.runtime
        }
    }

    fn gate_url() -> String {
        RuntimeConfig::default().gate.gate_url
    }

    fn action(action: GateAction) -> BridgeOutput {
        BridgeOutput::Action { action }
    }

    fn reply(reply: ControlResponse, id: i64) -> BridgeOutput {
        BridgeOutput::Reply {
            reply,
            id: Some(Value::from(id)),
        }
    }

    // =============================================================================
    // SESSION FLOW
    // =============================================================================

    #[tokio::test]
    async fn test_lock_login_and_restore_over_the_bridge() {
        let mut host = Host::start(RuntimeConfig::default());

        assert_eq!(
            host.recv().await,
            action(GateAction::OpenSession { url: gate_url() })
        );

        host.send(json!({
            "event": {"type": "SessionCreated", "session_id": 1, "url": "https://a.example"}
        }))
        .await;
        assert_eq!(
            host.recv().await,
            action(GateAction::RedirectSession {
                session_id: SessionId(1),
                url: gate_url(),
            })
        );

        host.send(json!({"control": {"action": "login", "password": "Au"}, "id": 1}))
            .await;
        let lines = host.recv_n(2).await;
        assert!(lines.contains(&action(GateAction::RedirectSession {
            session_id: SessionId(1),
            url: "https://a.example".into(),
        })));
        assert!(lines.iter().any(|line| matches!(
            line,
            BridgeOutput::Reply {
                reply: ControlResponse::Authorized { released },
                ..
            } if released.iter().any(|r| r.session_id == SessionId(1))
        )));

        host.send(json!({"control": {"action": "checkLogin"}, "id": 2}))
            .await;
        assert_eq!(
            host.recv().await,
            reply(ControlResponse::Status { is_logged_in: true }, 2)
        );

        host.send(json!({"control": {"action": "logout"}, "id": 3}))
            .await;
        let lines = host.recv_n(2).await;
        assert!(lines.contains(&reply(ControlResponse::LoggedOut, 3)));
        assert!(lines.contains(&action(GateAction::RedirectSession {
            session_id: SessionId(1),
            url: gate_url(),
        })));

        let runtime = host.stop().await;
        assert!(!runtime.gate().is_logged_in().await);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_denied_over_the_bridge() {
        let mut host = Host::start(RuntimeConfig::default());
        host.recv().await;

        host.send(json!({"control": {"action": "login", "password": "nope"}, "id": 9}))
            .await;
        assert_eq!(
            host.recv().await,
            reply(
                ControlResponse::Denied {
                    message: "Incorrect password!".into()
                },
                9
            )
        );

        let runtime = host.stop().await;
        assert_eq!(runtime.metrics().logins_denied, 1);
    }

    // =============================================================================
    // PERSISTENCE
    // =============================================================================

    #[tokio::test]
    async fn test_secret_change_survives_restart_but_login_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("gate").join("state.json");
        let config = RuntimeConfig {
            state_file: Some(state_file.clone()),
            ..Default::default()
        };

        let mut host = Host::start(config.clone());
        host.recv().await;
        host.send(json!({"control": {"action": "login", "password": "Au"}, "id": 1}))
            .await;
        host.recv().await;
        host.send(json!({
            "control": {
                "action": "changePassword",
                "newPassword": "correct horse",
                "confirmPassword": "correct horse"
            },
            "id": 2
        }))
        .await;
        assert_eq!(host.recv().await, reply(ControlResponse::SecretChanged, 2));
        host.stop().await;

        let persisted: Value =
            serde_json::from_slice(&std::fs::read(&state_file).unwrap()).unwrap();
        assert_eq!(persisted[KEY_PASSWORD], json!("correct horse"));
        assert_eq!(persisted[KEY_IS_LOGGED_IN], json!(true));

        let mut host = Host::start(config);
        host.recv().await;
        host.send(json!({"control": {"action": "checkLogin"}, "id": 3}))
            .await;
        assert_eq!(
            host.recv().await,
            reply(ControlResponse::Status { is_logged_in: false }, 3)
        );
        host.send(json!({"control": {"action": "login", "password": "Au"}, "id": 4}))
            .await;
        assert!(matches!(
            host.recv().await,
            BridgeOutput::Reply {
                reply: ControlResponse::Denied { .. },
                ..
            }
        ));
        host.send(json!({"control": {"action": "login", "password": "correct horse"}, "id": 5}))
            .await;
        assert!(matches!(
            host.recv().await,
            BridgeOutput::Reply {
                reply: ControlResponse::Authorized { .. },
                ..
            }
        ));
        host.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_lines_are_reported_and_skipped() {
        let mut host = Host::start(RuntimeConfig::default());
        host.recv().await;

        host.input
            .as_mut()
            .unwrap()
            .write_all(b"{\"event\":{\"type\":\"Teleport\"}}\n")
            .await
            .unwrap();
        assert!(matches!(host.recv().await, BridgeOutput::Error { .. }));

        host.send(json!({"control": {"action": "checkLogin"}, "id": 1}))
            .await;
        assert_eq!(
            host.recv().await,
            reply(ControlResponse::Status { is_logged_in: false }, 1)
        );
        host.stop().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_a_live_bridge() {
        let mut host = Host::start(RuntimeConfig::default());
        host.recv().await;

        host.runtime.shutdown();

        // Input still open: only the shutdown signal ends the run.
        tokio::time::timeout(READ_TIMEOUT, &mut host.task)
            .await
            .expect("runtime did not stop")
            .unwrap()
            .unwrap();
    }
}
