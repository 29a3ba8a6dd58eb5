// src/search.rs
//! Remote search collaborator.
//!
//! The cache only needs "any of these N identifiers, give me identifier and
//! title, at most N rows". Transport and query language belong to the
//! implementor.

use async_trait::async_trait;

use crate::error::SearchError;

pub const IDENTIFIER_FIELD: &str = "identifier";
pub const TITLE_FIELD: &str = "title";

/// One grouped query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub fields: Vec<String>,
    pub rows: usize,
}

impl SearchParams {
    /// Query selecting exactly `identifiers`: `identifier:(a OR b OR c)`.
    pub fn for_identifiers(identifiers: &[String]) -> Self {
        Self {
            query: format!("{IDENTIFIER_FIELD}:({})", identifiers.join(" OR ")),
            fields: vec![TITLE_FIELD.to_string(), IDENTIFIER_FIELD.to_string()],
            rows: identifiers.len(),
        }
    }
}

/// A returned row. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchDoc {
    pub identifier: Option<String>,
    pub title: Option<String>,
}

impl SearchDoc {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            title: Some(title.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub docs: Vec<SearchDoc>,
}

impl SearchResponse {
    pub fn new(docs: Vec<SearchDoc>) -> Self {
        Self { docs }
    }
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, params: SearchParams) -> Result<SearchResponse, SearchError>;
}
