//! Gate policy
//!
//! Pure functions, no I/O. The controller feeds them a snapshot taken under
//! its lock and applies the verdict in the same critical section.
//!
//! Decision order:
//! 1. not initialized → Redirect (fail safe toward locked)
//! 2. internal/gate URL → Allow
//! 3. logged in → Allow
//! 4. session already exempt → Allow (no duplicate redirect of the gate page)
//! 5. otherwise → Redirect and exempt the session

use serde::{Deserialize, Serialize};

use super::navigation::SecretChangeRejection;
use crate::config::GateConfig;

/// State observed for one decision
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecisionSnapshot {
    pub initialized: bool,
    pub logged_in: bool,
    pub exempt: bool,
}

/// Outcome of the policy, with the rule that produced it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    RedirectNotReady,
    AllowInternal,
    AllowAuthenticated,
    AllowExempt,
    RedirectLocked,
}

impl Verdict {
    pub fn is_allow(self) -> bool {
        matches!(
            self,
            Verdict::AllowInternal | Verdict::AllowAuthenticated | Verdict::AllowExempt
        )
    }

    /// Whether the session must be added to the exemption registry
    pub fn exempts_session(self) -> bool {
        matches!(self, Verdict::RedirectLocked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::RedirectNotReady => "redirect_not_ready",
            Verdict::AllowInternal => "allow_internal",
            Verdict::AllowAuthenticated => "allow_authenticated",
            Verdict::AllowExempt => "allow_exempt",
            Verdict::RedirectLocked => "redirect_locked",
        }
    }
}

pub fn evaluate(snapshot: DecisionSnapshot, url: &str, config: &GateConfig) -> Verdict {
    if !snapshot.initialized {
        return Verdict::RedirectNotReady;
    }
    if is_internal_url(url, config) {
        return Verdict::AllowInternal;
    }
    if snapshot.logged_in {
        return Verdict::AllowAuthenticated;
    }
    if snapshot.exempt {
        return Verdict::AllowExempt;
    }
    Verdict::RedirectLocked
}

/// Internal URLs are the gate UI itself and anything under the configured
/// internal prefixes. An empty URL is not internal.
pub fn is_internal_url(url: &str, config: &GateConfig) -> bool {
    if url.is_empty() {
        return false;
    }
    url.starts_with(&config.gate_url)
        || config
            .internal_url_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && url.starts_with(prefix.as_str()))
}

/// Lowercased scheme of an absolute URL
pub fn scheme_of(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

/// Whether a navigation to this URL is subject to gating
pub fn is_guarded_scheme(url: &str, config: &GateConfig) -> bool {
    match scheme_of(url) {
        Some(scheme) => config
            .guarded_schemes
            .iter()
            .any(|guarded| guarded.eq_ignore_ascii_case(&scheme)),
        None => false,
    }
}

/// Checks run in the same order as the credential UI: presence, length,
/// confirmation.
pub fn validate_secret_change(
    logged_in: bool,
    new_secret: &str,
    confirmation: &str,
    min_len: usize,
) -> Result<(), SecretChangeRejection> {
    if !logged_in {
        return Err(SecretChangeRejection::NotAuthenticated);
    }
    if new_secret.is_empty() || confirmation.is_empty() {
        return Err(SecretChangeRejection::Empty);
    }
    if new_secret.chars().count() < min_len {
        return Err(SecretChangeRejection::TooShort { min: min_len });
    }
    if new_secret != confirmation {
        return Err(SecretChangeRejection::Mismatch);
    }
    Ok(())
}
