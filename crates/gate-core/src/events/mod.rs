//! Events Layer - message types crossing the host boundary
//!
//! - `inbound`: lifecycle/navigation triggers consumed by the dispatcher
//! - `outbound`: actions the host redirect mechanism must carry out
//! - `control`: RPC between the credential-entry UI and the gate

pub mod control;
pub mod inbound;
pub mod outbound;

pub use control::{ControlRequest, ControlResponse};
pub use inbound::{GateEvent, InstallReason};
pub use outbound::GateAction;
