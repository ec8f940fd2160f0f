//! Line-delimited JSON wire format between the host and the coordinator.
//!
//! In:  `{"event": {...}}` or `{"control": {...}, "id": ...}`
//! Out: `{"action": {...}}`, `{"reply": {...}, "id": ...}` or `{"error": "..."}`

use gate_core::{ControlRequest, ControlResponse, GateAction, GateEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BridgeInput {
    Event {
        event: GateEvent,
    },
    Control {
        control: ControlRequest,
        #[serde(default)]
        id: Option<Value>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeOutput {
    Action {
        action: GateAction,
    },
    Reply {
        reply: ControlResponse,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
    Error {
        error: String,
    },
}

impl BridgeInput {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

impl BridgeOutput {
    /// Serialize as one line, newline included
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
