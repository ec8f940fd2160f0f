//! Inbound triggers
//!
//! Each variant maps onto exactly one controller/registry call in the
//! dispatcher.

use serde::{Deserialize, Serialize};

use crate::domain::{NavigationPhase, SessionId};

/// Why the install/update trigger fired
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    Install,
    Update,
    #[serde(rename = "chrome_update")]
    BrowserUpdate,
    SharedModuleUpdate,
}

impl InstallReason {
    pub fn is_fresh_install(self) -> bool {
        matches!(self, InstallReason::Install)
    }
}

/// A lifecycle or navigation trigger from the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GateEvent {
    ProcessStart,
    BrowserStart,
    InstalledOrUpdated {
        reason: InstallReason,
    },
    /// A window closed; the dispatcher checks whether any remain
    AllSessionsClosed,
    NavigationBegin {
        session_id: SessionId,
        url: String,
        #[serde(default = "default_main_frame")]
        is_main_frame: bool,
    },
    SessionCreated {
        session_id: SessionId,
        #[serde(default)]
        url: String,
    },
    SessionActivated {
        session_id: SessionId,
    },
    SessionUpdated {
        session_id: SessionId,
        #[serde(default)]
        url: String,
        phase: NavigationPhase,
    },
    SessionClosed {
        session_id: SessionId,
    },
    /// Main-frame request seen by a stricter interception layer
    NetworkRequest {
        session_id: SessionId,
        url: String,
    },
}

fn default_main_frame() -> bool {
    true
}

impl GateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GateEvent::ProcessStart => "ProcessStart",
            GateEvent::BrowserStart => "BrowserStart",
            GateEvent::InstalledOrUpdated { .. } => "InstalledOrUpdated",
            GateEvent::AllSessionsClosed => "AllSessionsClosed",
            GateEvent::NavigationBegin { .. } => "NavigationBegin",
            GateEvent::SessionCreated { .. } => "SessionCreated",
            GateEvent::SessionActivated { .. } => "SessionActivated",
            GateEvent::SessionUpdated { .. } => "SessionUpdated",
            GateEvent::SessionClosed { .. } => "SessionClosed",
            GateEvent::NetworkRequest { .. } => "NetworkRequest",
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            GateEvent::NavigationBegin { session_id, .. }
            | GateEvent::SessionCreated { session_id, .. }
            | GateEvent::SessionActivated { session_id }
            | GateEvent::SessionUpdated { session_id, .. }
            | GateEvent::SessionClosed { session_id }
            | GateEvent::NetworkRequest { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }
}
