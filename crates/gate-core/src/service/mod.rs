//! Service Layer
//!
//! Application services that orchestrate the domain and drive the ports.

pub mod gate_controller;
pub mod login_session;
pub mod reevaluate;

pub use gate_controller::GateController;
pub use login_session::{LoginReport, LoginSession};
pub use reevaluate::{apply_actions, redirect_action, reevaluate_sessions};
