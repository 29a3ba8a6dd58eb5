// src/store.rs
//! Persistent key-value store collaborator and an in-process implementation.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::StoreError;

/// Durable mirror for the cache mapping. The cache writes the whole mapping
/// under one key and reads it back once at hydration.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Fetch the value stored under `key`, `None` if missing or expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Overwrite the value under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StoreError>;
}

struct Stored {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory store with per-key expiry. Expired values are dropped lazily on
/// read or eagerly by [`clean_expired`](Self::clean_expired).
#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, Stored>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    /// Seed a value with no expiry.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.values.insert(
            key.into(),
            Stored {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    /// Current value under `key`, ignoring expiry.
    pub fn peek(&self, key: &str) -> Option<Bytes> {
        self.values.get(key).map(|s| s.value.clone())
    }

    pub fn delete(&self, key: &str) {
        self.values.remove(key);
    }

    pub fn clean_expired(&self) {
        let now = Instant::now();
        self.values.retain(|_, stored| !stored.is_expired(now));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let now = Instant::now();
        let expired = match self.values.get(key) {
            Some(stored) if !stored.is_expired(now) => return Ok(Some(stored.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.values.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now().checked_add(ttl);
        self.values
            .insert(key.to_string(), Stored { value, expires_at });
        Ok(())
    }
}
