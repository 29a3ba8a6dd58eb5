// src/display.rs
//! Text label that shows a collection's name once it resolves.
//!
//! Until a name is known (or when there is none) the raw identifier is shown.

use std::sync::Arc;

use crate::cache::CollectionNameSource;

#[derive(Default)]
pub struct AsyncCollectionName {
    source: Option<Arc<dyn CollectionNameSource>>,
    identifier: Option<String>,
    name: Option<String>,
}

impl AsyncCollectionName {
    pub fn new(source: Arc<dyn CollectionNameSource>, identifier: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            identifier: Some(identifier.into()),
            name: None,
        }
    }

    /// Change the identifier. Returns `true` if it changed and a
    /// [`refresh`](Self::refresh) is due.
    pub fn set_identifier(&mut self, identifier: Option<String>) -> bool {
        if self.identifier == identifier {
            return false;
        }
        self.identifier = identifier;
        self.name = None;
        true
    }

    /// Swap the name source. Always requires a refresh.
    pub fn set_source(&mut self, source: Option<Arc<dyn CollectionNameSource>>) -> bool {
        self.source = source;
        self.name = None;
        true
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Fetch the name for the current identifier. No-op without both a
    /// source and an identifier.
    pub async fn refresh(&mut self) {
        let (Some(source), Some(identifier)) = (&self.source, &self.identifier) else {
            return;
        };
        self.name = source.collection_name_for(identifier).await;
    }

    pub fn render(&self) -> String {
        self.name
            .as_deref()
            .or(self.identifier.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}
