// src/entry.rs
//! Cached entries and the persisted mapping codec.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Canonical cache key for an identifier. Identifiers are case-insensitive.
pub fn normalize(identifier: &str) -> String {
    identifier.to_lowercase()
}

/// Outcome of a completed lookup for one identifier.
///
/// An identifier that was never looked up has no entry at all; `NotFound`
/// means the search service was asked and returned no usable title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ResolvedName {
    Named(String),
    NotFound,
}

impl ResolvedName {
    /// Build from a title as returned by the search service. Empty titles
    /// count as missing.
    pub fn from_title(title: Option<String>) -> Self {
        match title {
            Some(t) if !t.is_empty() => ResolvedName::Named(t),
            _ => ResolvedName::NotFound,
        }
    }

    pub fn as_option(&self) -> Option<String> {
        match self {
            ResolvedName::Named(name) => Some(name.clone()),
            ResolvedName::NotFound => None,
        }
    }
}

impl From<Option<String>> for ResolvedName {
    fn from(value: Option<String>) -> Self {
        ResolvedName::from_title(value)
    }
}

impl From<ResolvedName> for Option<String> {
    fn from(value: ResolvedName) -> Self {
        match value {
            ResolvedName::Named(name) => Some(name),
            ResolvedName::NotFound => None,
        }
    }
}

/// One resolved identifier held by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: ResolvedName,
    /// Milliseconds since the Unix epoch of the last read or fill.
    pub last_access: i64,
}

impl CacheEntry {
    pub fn new(name: ResolvedName, now_ms: i64) -> Self {
        Self {
            name,
            last_access: now_ms,
        }
    }

    /// Record an access. Never moves the timestamp backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_access = self.last_access.max(now_ms);
    }
}

/// Wire shape of one persisted entry: `{"name": ..., "lastAccess": ...}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_access: Option<i64>,
}

/// Encode the whole mapping as the JSON value written to the store.
pub fn encode_entries(entries: &HashMap<String, CacheEntry>) -> Result<Bytes> {
    let stored: HashMap<&str, StoredEntry> = entries
        .iter()
        .map(|(id, entry)| {
            (
                id.as_str(),
                StoredEntry {
                    name: entry.name.as_option(),
                    last_access: Some(entry.last_access),
                },
            )
        })
        .collect();
    Ok(Bytes::from(serde_json::to_vec(&stored)?))
}

/// Decode a persisted mapping. Keys are re-normalized; entries without an
/// access time are stamped with `now_ms`.
pub fn decode_entries(raw: &[u8], now_ms: i64) -> Result<HashMap<String, CacheEntry>> {
    let stored: HashMap<String, StoredEntry> = serde_json::from_slice(raw)?;
    Ok(stored
        .into_iter()
        .map(|(id, entry)| {
            let name = ResolvedName::from_title(entry.name);
            let last_access = entry.last_access.unwrap_or(now_ms);
            (normalize(&id), CacheEntry::new(name, last_access))
        })
        .collect())
}
