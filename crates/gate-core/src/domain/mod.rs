//! Domain Layer
//!
//! Pure business logic: auth state, the gate state machine, the session
//! exemption registry and the decision policy. No I/O.

pub mod auth_state;
pub mod navigation;
pub mod policy;
pub mod session;

pub use auth_state::{
    read_bool, read_string, AuthEpoch, AuthState, CredentialSecret, GateState, GateTransition,
    StoreMap, KEY_IS_FIRST_RUN, KEY_IS_LOGGED_IN, KEY_PASSWORD,
};
pub use navigation::{
    GateDecision, LoginOutcome, NavigationEvent, NavigationPhase, SecretChangeRejection,
};
pub use policy::{
    evaluate, is_guarded_scheme, is_internal_url, scheme_of, validate_secret_change,
    DecisionSnapshot, Verdict,
};
pub use session::{ExemptEntry, ReleasedSession, SessionId, SessionInfo, SessionRegistry};
