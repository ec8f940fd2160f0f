//! Navigation events and gate verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

use super::session::{ReleasedSession, SessionId};

/// Where in its lifecycle a session was when the event fired
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPhase {
    BeforeNavigate,
    Created,
    Activated,
    Loading,
    Complete,
    Request,
}

impl NavigationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationPhase::BeforeNavigate => "before_navigate",
            NavigationPhase::Created => "created",
            NavigationPhase::Activated => "activated",
            NavigationPhase::Loading => "loading",
            NavigationPhase::Complete => "complete",
            NavigationPhase::Request => "request",
        }
    }
}

/// A single decision request. Consumed once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub session_id: SessionId,
    pub url: String,
    pub is_main_frame: bool,
    pub phase: NavigationPhase,
}

impl NavigationEvent {
    pub fn new(session_id: SessionId, url: impl Into<String>, phase: NavigationPhase) -> Self {
        Self {
            session_id,
            url: url.into(),
            is_main_frame: true,
            phase,
        }
    }

    pub fn with_main_frame(mut self, is_main_frame: bool) -> Self {
        self.is_main_frame = is_main_frame;
        self
    }
}

/// Allow the session through, or send it to the gate UI
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "gate_url", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, GateDecision::Redirect(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Allow => "allow",
            GateDecision::Redirect(_) => "redirect",
        }
    }
}

/// Result of a credential check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Gate unlocked. Carries the sessions that were exempt before the
    /// epoch changed.
    Authorized { released: Vec<ReleasedSession> },
    Denied,
}

impl LoginOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, LoginOutcome::Authorized { .. })
    }
}

/// Why a secret change was refused
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SecretChangeRejection {
    NotAuthenticated,
    Empty,
    TooShort { min: usize },
    Mismatch,
}

impl fmt::Display for SecretChangeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretChangeRejection::NotAuthenticated => {
                f.write_str("You must be logged in to change the password!")
            }
            SecretChangeRejection::Empty => f.write_str("Please fill in both password fields!"),
            SecretChangeRejection::TooShort { min } => {
                write!(f, "Password must be at least {min} characters!")
            }
            SecretChangeRejection::Mismatch => f.write_str("Passwords do not match!"),
        }
    }
}
