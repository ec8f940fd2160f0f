//! Adapters Layer
//!
//! Concrete implementations of the driven ports.

pub mod channel_navigator;
pub mod file_store;
pub mod memory_store;

pub use channel_navigator::{ChannelNavigator, DEFAULT_ACTION_CAPACITY};
pub use file_store::FileStateStore;
pub use memory_store::MemoryStateStore;
