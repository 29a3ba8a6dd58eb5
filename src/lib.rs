// src/lib.rs
//! Collection display-name resolution.
//!
//! [`NameCache`] turns many concurrent "what is this collection called?"
//! requests into a few grouped search queries, remembers the answers
//! (including "no name") for the session, optionally mirrors them into a
//! [`PersistentStore`] for later sessions, and prunes them by age and count.

pub mod cache;
mod clock;
pub mod config;
pub mod display;
pub mod entry;
pub mod error;
pub mod file_store;
mod pending;
pub mod search;
pub mod store;

pub use cache::{CacheStats, CollectionNameSource, NameCache, NameCacheBuilder};
pub use config::CacheConfig;
pub use display::AsyncCollectionName;
pub use entry::{normalize, CacheEntry, ResolvedName};
pub use error::{Error, Result, SearchError, StoreError};
pub use file_store::FileStore;
pub use search::{SearchDoc, SearchParams, SearchResponse, SearchService};
pub use store::{MemoryStore, PersistentStore};
