//! In-process session navigator
//!
//! Keeps a table of open sessions mirrored from host events and publishes
//! every applied `GateAction` on a broadcast channel. The runtime bridge
//! forwards that channel to the host.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::domain::{SessionId, SessionInfo};
use crate::error::NavigatorError;
use crate::events::{GateAction, GateEvent};
use crate::ports::{NavigatorResult, SessionNavigator};

pub const DEFAULT_ACTION_CAPACITY: usize = 256;

/// Ids handed out to sessions opened by the gate itself
const OPENED_ID_BASE: u64 = 1 << 48;

#[derive(Debug, Default)]
struct SessionTable {
    sessions: BTreeMap<SessionId, String>,
    windows: usize,
}

pub struct ChannelNavigator {
    table: RwLock<SessionTable>,
    sender: broadcast::Sender<GateAction>,
    next_opened_id: AtomicU64,
    available: AtomicBool,
}

impl Default for ChannelNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelNavigator {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ACTION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            table: RwLock::new(SessionTable::default()),
            sender,
            next_opened_id: AtomicU64::new(OPENED_ID_BASE),
            available: AtomicBool::new(true),
        }
    }

    /// Receive every action applied from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GateAction> {
        self.sender.subscribe()
    }

    /// Track a session, or update its URL if already known
    pub fn open_session(&self, session_id: SessionId, url: impl Into<String>) {
        let mut table = self.table.write();
        table.sessions.insert(session_id, url.into());
        table.windows = table.windows.max(1);
    }

    /// Forget a session. Closing the last one closes the last window.
    pub fn close_session(&self, session_id: SessionId) -> bool {
        let mut table = self.table.write();
        let removed = table.sessions.remove(&session_id).is_some();
        if table.sessions.is_empty() {
            table.windows = 0;
        }
        removed
    }

    pub fn set_window_count(&self, windows: usize) {
        self.table.write().windows = windows;
    }

    /// Make every port call fail with `NavigatorError::Unavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn session_url_now(&self, session_id: SessionId) -> Option<String> {
        self.table.read().sessions.get(&session_id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.table.read().sessions.len()
    }

    /// Mirror a host event into the session table
    pub fn observe(&self, event: &GateEvent) {
        match event {
            GateEvent::SessionCreated { session_id, url } => self.open_session(*session_id, url),
            GateEvent::NavigationBegin {
                session_id,
                url,
                is_main_frame: true,
            }
            | GateEvent::NetworkRequest { session_id, url } => {
                self.open_session(*session_id, url.clone())
            }
            GateEvent::SessionUpdated {
                session_id, url, ..
            } if !url.is_empty() => self.open_session(*session_id, url),
            GateEvent::SessionClosed { session_id } => {
                self.close_session(*session_id);
            }
            _ => {}
        }
    }

    fn check_available(&self) -> NavigatorResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NavigatorError::Unavailable("navigator switched off".into()))
        }
    }

    fn publish(&self, action: GateAction) {
        // No subscriber is not an error.
        let receivers = self.sender.send(action).unwrap_or(0);
        trace!(receivers, "Action published");
    }
}

#[async_trait]
impl SessionNavigator for ChannelNavigator {
    async fn list_sessions(&self) -> NavigatorResult<Vec<SessionInfo>> {
        self.check_available()?;
        Ok(self
            .table
            .read()
            .sessions
            .iter()
            .map(|(id, url)| SessionInfo::new(*id, url.clone()))
            .collect())
    }

    async fn session_url(&self, session_id: SessionId) -> NavigatorResult<Option<String>> {
        self.check_available()?;
        Ok(self.session_url_now(session_id))
    }

    async fn open_window_count(&self) -> NavigatorResult<usize> {
        self.check_available()?;
        Ok(self.table.read().windows)
    }

    async fn apply(&self, action: GateAction) -> NavigatorResult<()> {
        self.check_available()?;
        match &action {
            GateAction::RedirectSession { session_id, url } => {
                let mut table = self.table.write();
                let Some(current) = table.sessions.get_mut(session_id) else {
                    return Err(NavigatorError::SessionGone(*session_id));
                };
                *current = url.clone();
            }
            GateAction::OpenSession { url } => {
                let id = SessionId(self.next_opened_id.fetch_add(1, Ordering::Relaxed));
                self.open_session(id, url.clone());
                debug!(session_id = %id, "Gate session opened");
            }
        }
        self.publish(action);
        Ok(())
    }
}
