//! In-memory auth state store
//!
//! Backs tests and ephemeral runs. Failure hooks let callers simulate an
//! unavailable or stalled store.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::StoreMap;
use crate::error::StoreError;
use crate::ports::{AuthStateStore, StoreResult};

#[derive(Debug)]
pub struct MemoryStateStore {
    values: RwLock<StoreMap>,
    available: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStateStore {
    /// Create an empty store (first run)
    pub fn new() -> Self {
        Self::from_map(StoreMap::new())
    }

    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::from_map(
            values
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    fn from_map(values: StoreMap) -> Self {
        Self {
            values: RwLock::new(values),
            available: AtomicBool::new(true),
            read_delay: Mutex::new(None),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay `get` results. Values are captured before the delay, like a
    /// response that is already in flight.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock() = delay;
    }

    pub async fn snapshot(&self) -> StoreMap {
        self.values.read().await.clone()
    }

    /// Write a value directly, bypassing the failure hooks
    pub async fn insert(&self, key: impl Into<String>, value: Value) {
        self.values.write().await.insert(key.into(), value);
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store switched off".into()))
        }
    }
}

#[async_trait]
impl AuthStateStore for MemoryStateStore {
    async fn get(&self, keys: &[&str]) -> StoreResult<StoreMap> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let found: StoreMap = {
            let values = self.values.read().await;
            keys.iter()
                .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect()
        };

        let delay = *self.read_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(found)
    }

    async fn set(&self, values: StoreMap) -> StoreResult<()> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.values.write().await.extend(values);
        Ok(())
    }
}
