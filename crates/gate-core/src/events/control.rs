//! Control RPC messages exchanged with the credential-entry UI
//!
//! Tagged by `action` on the way in and `status` on the way out so the UI
//! can stay a thin form over these shapes.

use serde::{Deserialize, Serialize};

use crate::domain::ReleasedSession;

#[derive(Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlRequest {
    CheckLogin,
    Login {
        password: String,
    },
    Logout,
    ChangePassword {
        #[serde(rename = "newPassword")]
        new_password: String,
        #[serde(rename = "confirmPassword")]
        confirm_password: String,
    },
}

impl ControlRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ControlRequest::CheckLogin => "checkLogin",
            ControlRequest::Login { .. } => "login",
            ControlRequest::Logout => "logout",
            ControlRequest::ChangePassword { .. } => "changePassword",
        }
    }
}

// Requests carry credentials; keep them out of logs.
impl std::fmt::Debug for ControlRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ControlRequest::{}", self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ControlResponse {
    Status {
        #[serde(rename = "isLoggedIn")]
        is_logged_in: bool,
    },
    Authorized {
        released: Vec<ReleasedSession>,
    },
    Denied {
        message: String,
    },
    LoggedOut,
    SecretChanged,
    Rejected {
        message: String,
    },
    Error {
        message: String,
    },
}
