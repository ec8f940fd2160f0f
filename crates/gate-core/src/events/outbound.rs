//! Outbound actions for the host redirect mechanism

use serde::{Deserialize, Serialize};

use crate::domain::SessionId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GateAction {
    /// Navigate an existing session
    RedirectSession { session_id: SessionId, url: String },
    /// Open a new session on the given URL
    OpenSession { url: String },
}

impl GateAction {
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            GateAction::RedirectSession { session_id, .. } => Some(*session_id),
            GateAction::OpenSession { .. } => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            GateAction::RedirectSession { url, .. } | GateAction::OpenSession { url } => url,
        }
    }
}
