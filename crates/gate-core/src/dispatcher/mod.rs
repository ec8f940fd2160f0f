//! Dispatcher Layer
//!
//! Entry point for host lifecycle and navigation triggers.

pub mod event_dispatcher;

pub use event_dispatcher::EventDispatcher;
