//! # Gate Core
//!
//! Shared authentication gate: every browsing session is held at a
//! credential-entry page until the stored secret is supplied. The gate
//! re-locks when the last window closes or the process restarts.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure business logic, no I/O
//!   - `AuthState` / `GateState`: auth mirror and its state machine
//!   - `SessionRegistry`: sessions exempt from redirection
//!   - `policy`: the ordered allow/redirect rules
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `GateApi`: Driving port (inbound API)
//!   - `AuthStateStore`: Driven port (persisted key-value store)
//!   - `SessionNavigator`: Driven port (host sessions and redirects)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `GateController`: Implements `GateApi`
//!   - `LoginSession`: credential submission and session release
//!
//! - **Dispatcher** (`dispatcher/`): host triggers to gate calls
//!
//! - **Handler Layer** (`handler/`): control RPC for the gate UI
//!
//! - **Events Layer** (`events/`): messages crossing the host boundary
//!
//! - **Adapters Layer** (`adapters/`): memory/file stores, channel navigator
//!
//! ## Guarantees
//!
//! - Before initialization no non-internal URL is ever allowed.
//! - Every restart and every last-window close leaves the gate locked.
//! - A store failure or timeout resolves a decision to Redirect.
//! - Auth transitions are serialized; a decision that raced one is
//!   re-validated before it acts.
//!
//! ## Usage Example
//!
//! ```ignore
//! use gate_core::{ChannelNavigator, EventDispatcher, GateController, GateEvent, MemoryStateStore};
//!
//! let gate = Arc::new(GateController::new(Arc::new(MemoryStateStore::new())));
//! let navigator = Arc::new(ChannelNavigator::new());
//! let dispatcher = EventDispatcher::new(gate, navigator, GateConfig::default());
//!
//! dispatcher.dispatch(GateEvent::ProcessStart).await;
//! ```

pub mod adapters;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod events;
pub mod handler;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{ChannelNavigator, FileStateStore, MemoryStateStore};
pub use config::{GateConfig, DEFAULT_SECRET, MIN_SECRET_LEN};
pub use dispatcher::EventDispatcher;
pub use domain::{
    GateDecision, GateState, LoginOutcome, NavigationEvent, NavigationPhase, ReleasedSession,
    SecretChangeRejection, SessionId, SessionInfo,
};
pub use error::{ConfigError, GateError, GateResult, NavigatorError, StoreError};
pub use events::{ControlRequest, ControlResponse, GateAction, GateEvent, InstallReason};
pub use handler::ControlHandler;
pub use metrics::{GateMetrics, MetricsSnapshot};
pub use ports::{AuthStateStore, GateApi, SessionNavigator};
pub use service::{GateController, LoginReport, LoginSession};
