//! # SafeGate Runtime
//!
//! Long-running background coordinator for the authentication gate.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (env overrides over defaults)
//! 2. Open the auth state store (file or memory)
//! 3. Wire controller, navigator, dispatcher and control handler
//! 4. Start forwarding host actions to the output
//! 5. Dispatch `ProcessStart` (gate becomes ready and locked)
//! 6. Pump input lines until EOF or shutdown
//!
//! Each input event is processed on its own task; only the session table
//! update that precedes it happens in arrival order.

pub mod bridge;
pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gate_core::domain::StoreMap;
use gate_core::ports::StoreResult;
use gate_core::{
    AuthStateStore, ChannelNavigator, ControlHandler, EventDispatcher, FileStateStore,
    GateAction, GateController, GateEvent, MemoryStateStore, MetricsSnapshot,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use bridge::{BridgeInput, BridgeOutput};
pub use config::RuntimeConfig;

/// Store selected at startup
pub enum RuntimeStore {
    Memory(MemoryStateStore),
    File(FileStateStore),
}

#[async_trait]
impl AuthStateStore for RuntimeStore {
    async fn get(&self, keys: &[&str]) -> StoreResult<StoreMap> {
        match self {
            RuntimeStore::Memory(store) => store.get(keys).await,
            RuntimeStore::File(store) => store.get(keys).await,
        }
    }

    async fn set(&self, values: StoreMap) -> StoreResult<()> {
        match self {
            RuntimeStore::Memory(store) => store.set(values).await,
            RuntimeStore::File(store) => store.set(values).await,
        }
    }
}

type Gate = GateController<RuntimeStore>;

pub struct GateRuntime {
    config: RuntimeConfig,
    gate: Arc<Gate>,
    navigator: Arc<ChannelNavigator>,
    dispatcher: Arc<EventDispatcher<Gate, ChannelNavigator>>,
    control: Arc<ControlHandler<Gate, ChannelNavigator>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl GateRuntime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config
            .gate
            .validate()
            .context("Invalid gate configuration")?;

        let store = match &config.state_file {
            Some(path) => RuntimeStore::File(FileStateStore::new(path)),
            None => RuntimeStore::Memory(MemoryStateStore::new()),
        };
        let gate = Arc::new(GateController::with_config(
            Arc::new(store),
            config.gate.clone(),
        ));
        let navigator = Arc::new(ChannelNavigator::with_capacity(config.event_buffer));
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::clone(&gate),
            Arc::clone(&navigator),
            config.gate.clone(),
        ));
        let control = Arc::new(ControlHandler::new(
            Arc::clone(&gate),
            Arc::clone(&navigator),
            config.gate.clone(),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            gate,
            navigator,
            dispatcher,
            control,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn gate(&self) -> &Arc<Gate> {
        &self.gate
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.gate.metrics().snapshot()
    }

    /// Run the bridge until the input ends or shutdown is signalled.
    ///
    /// Returns the output once every pending line has been written.
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel(self.config.event_buffer);
        let writer = tokio::spawn(write_lines(out_rx, output));
        let forwarder = self.spawn_action_forwarder(out_tx.clone());

        info!(gate_url = %self.config.gate.gate_url, "Gate runtime started");
        self.dispatcher.dispatch(GateEvent::ProcessStart).await;

        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        let mut lines = input.lines();
        let mut shutdown = self.shutdown_rx.clone();

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read input")?,
                _ = shutdown.changed() => {
                    info!("Shutdown signal received");
                    break;
                }
            };
            let Some(line) = line else {
                debug!("Input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            in_flight.retain(|handle| !handle.is_finished());
            match BridgeInput::parse(&line) {
                Ok(BridgeInput::Event { event }) => {
                    self.navigator.observe(&event);
                    let dispatcher = Arc::clone(&self.dispatcher);
                    in_flight.push(tokio::spawn(async move {
                        dispatcher.dispatch(event).await;
                    }));
                }
                Ok(BridgeInput::Control { control, id }) => {
                    let handler = Arc::clone(&self.control);
                    let out_tx = out_tx.clone();
                    in_flight.push(tokio::spawn(async move {
                        let reply = handler.handle(control).await;
                        let _ = out_tx.send(BridgeOutput::Reply { reply, id }).await;
                    }));
                }
                Err(e) => {
                    warn!(error = %e, "Malformed input line");
                    let _ = out_tx
                        .send(BridgeOutput::Error {
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        for handle in in_flight {
            if let Err(e) = handle.await {
                error!(error = %e, "Event task failed");
            }
        }

        self.shutdown();
        forwarder.await.context("Action forwarder failed")?;
        drop(out_tx);
        let output = writer.await.context("Output writer failed")??;
        Ok(output)
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }

    fn spawn_action_forwarder(&self, out_tx: mpsc::Sender<BridgeOutput>) -> JoinHandle<()> {
        let mut actions = self.navigator.subscribe();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = actions.recv() => match received {
                        Ok(action) => forward(&out_tx, action).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Action output lagging, actions dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = shutdown.changed() => {
                        // Flush what was published before the signal.
                        while let Ok(action) = actions.try_recv() {
                            forward(&out_tx, action).await;
                        }
                        break;
                    }
                }
            }
        })
    }
}

async fn forward(out_tx: &mpsc::Sender<BridgeOutput>, action: GateAction) {
    if out_tx.send(BridgeOutput::Action { action }).await.is_err() {
        debug!("Output closed, action dropped");
    }
}

async fn write_lines<W>(mut out_rx: mpsc::Receiver<BridgeOutput>, mut output: W) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = out_rx.recv().await {
        let line = message.to_line().context("Failed to encode output")?;
        output
            .write_all(line.as_bytes())
            .await
            .context("Failed to write output")?;
        output.flush().await.context("Failed to flush output")?;
    }
    Ok(output)
}
