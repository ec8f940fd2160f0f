//! Control RPC handler for the credential-entry UI
//!
//! Every request gets a response; failures are reported in the response
//! body, never by dropping the request.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::GateConfig;
use crate::domain::LoginOutcome;
use crate::error::GateError;
use crate::events::{ControlRequest, ControlResponse};
use crate::ports::{GateApi, SessionNavigator};
use crate::service::LoginSession;

pub struct ControlHandler<G: ?Sized, N: ?Sized> {
    gate: Arc<G>,
    login: LoginSession<G, N>,
}

impl<G, N> ControlHandler<G, N>
where
    G: GateApi + ?Sized,
    N: SessionNavigator + ?Sized,
{
    pub fn new(gate: Arc<G>, navigator: Arc<N>, config: GateConfig) -> Self {
        Self {
            login: LoginSession::new(Arc::clone(&gate), navigator, config),
            gate,
        }
    }

    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        debug!(request = request.name(), "Control request");
        match request {
            ControlRequest::CheckLogin => ControlResponse::Status {
                is_logged_in: self.gate.is_logged_in().await,
            },
            ControlRequest::Login { password } => match self.login.submit(&password).await {
                Ok(report) => match report.outcome {
                    LoginOutcome::Authorized { released } => ControlResponse::Authorized { released },
                    LoginOutcome::Denied => ControlResponse::Denied {
                        message: GateError::CredentialMismatch.to_string(),
                    },
                },
                Err(e) => error_response(e),
            },
            ControlRequest::Logout => match self.login.sign_out().await {
                Ok(_) => ControlResponse::LoggedOut,
                Err(e) => error_response(e),
            },
            ControlRequest::ChangePassword {
                new_password,
                confirm_password,
            } => match self.gate.change_secret(&new_password, &confirm_password).await {
                Ok(()) => ControlResponse::SecretChanged,
                Err(GateError::InvalidSecretChange(reason)) => ControlResponse::Rejected {
                    message: reason.to_string(),
                },
                Err(e) => error_response(e),
            },
        }
    }
}

fn error_response(error: GateError) -> ControlResponse {
    warn!(error = %error, "Control request failed");
    ControlResponse::Error {
        message: error.to_string(),
    }
}
