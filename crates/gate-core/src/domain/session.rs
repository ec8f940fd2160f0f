//! Session handles and the exemption registry
//!
//! A session (tab/frame) is owned by the host. The registry only keeps
//! handles of sessions that are currently displaying the gate UI, so they
//! are not redirected a second time while the auth epoch is unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Opaque handle to a browsing session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A session as reported by the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    /// Current URL; empty for a session that has not committed a navigation
    pub url: String,
}

impl SessionInfo {
    pub fn new(id: impl Into<SessionId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Why a session is exempt
#[derive(Clone, Debug)]
pub struct ExemptEntry {
    /// URL the session was heading to when it was sent to the gate
    pub blocked_url: Option<String>,
    pub exempted_at: Instant,
}

/// A session released from the registry by an epoch change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasedSession {
    pub session_id: SessionId,
    pub blocked_url: Option<String>,
}

/// Sessions currently showing the gate UI
///
/// Not synchronized on its own: the controller owns it behind the same lock
/// as the auth state.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    exempt: HashMap<SessionId, ExemptEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a session as redirected. Keeps the first blocked URL if the
    /// session is already present.
    pub fn add(&mut self, id: SessionId, blocked_url: Option<String>) {
        self.exempt.entry(id).or_insert_with(|| ExemptEntry {
            blocked_url,
            exempted_at: Instant::now(),
        });
    }

    /// Returns true if the session was tracked.
    pub fn remove(&mut self, id: SessionId) -> bool {
        self.exempt.remove(&id).is_some()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.exempt.contains_key(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&ExemptEntry> {
        self.exempt.get(&id)
    }

    pub fn len(&self) -> usize {
        self.exempt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exempt.is_empty()
    }

    /// Clear every exemption, returning what was released (ordered by id)
    pub fn drain(&mut self) -> Vec<ReleasedSession> {
        let mut released: Vec<ReleasedSession> = self
            .exempt
            .drain()
            .map(|(session_id, entry)| ReleasedSession {
                session_id,
                blocked_url: entry.blocked_url,
            })
            .collect();
        released.sort_by_key(|r| r.session_id);
        released
    }

    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.exempt.keys().copied().collect();
        ids.sort();
        ids
    }
}
