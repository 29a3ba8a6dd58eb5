// src/error.rs
//! Error types for the name cache and its collaborators.
//!
//! A missing collection name is never an error: lookups resolve to `None`.
//! These types surface from configuration loading, the persisted-value codec
//! and the persistent store. Search failures never leave the cache: a failed
//! batch is logged and resolves its identifiers as not found.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The persistent store collaborator failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A persisted value could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a [`SearchService`](crate::search::SearchService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The request was sent but the service rejected or failed it.
    #[error("request failed: {0}")]
    Request(String),

    /// The service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by a [`PersistentStore`](crate::store::PersistentStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure (corrupt frame, rejected write, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
