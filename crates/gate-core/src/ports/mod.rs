//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - the gate API used by the dispatcher and UI
//! - Driven Ports (outbound) - the persisted store and the host navigator

pub mod inbound;
pub mod outbound;

pub use inbound::GateApi;
pub use outbound::{AuthStateStore, NavigatorResult, SessionNavigator, StoreResult};
