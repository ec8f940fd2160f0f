//! Handler Layer
//!
//! Request/response handling for the credential-entry UI.

pub mod control_handler;

pub use control_handler::ControlHandler;
