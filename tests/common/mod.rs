#![allow(dead_code)]

use async_trait::async_trait;
use collection_name_cache::{
    CacheConfig, NameCache, SearchDoc, SearchError, SearchParams, SearchResponse, SearchService,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub const CACHE_KEY: &str = "collection-name-cache";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Search double that records every query and replays a fixed result.
#[derive(Default)]
pub struct MockSearchService {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<SearchParams>,
    result: Option<Result<SearchResponse, SearchError>>,
}

impl MockSearchService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_response(response: SearchResponse) -> Arc<Self> {
        let mock = Self::default();
        mock.state.lock().result = Some(Ok(response));
        Arc::new(mock)
    }

    pub fn failing(error: SearchError) -> Arc<Self> {
        let mock = Self::default();
        mock.state.lock().result = Some(Err(error));
        Arc::new(mock)
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn last_params(&self) -> Option<SearchParams> {
        self.state.lock().calls.last().cloned()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().calls.iter().map(|p| p.query.clone()).collect()
    }
}

#[async_trait]
impl SearchService for MockSearchService {
    async fn search(&self, params: SearchParams) -> Result<SearchResponse, SearchError> {
        let mut state = self.state.lock();
        state.calls.push(params);
        state.result.clone().unwrap_or_else(|| Ok(SearchResponse::default()))
    }
}

pub fn full_response() -> SearchResponse {
    SearchResponse::new(vec![
        SearchDoc::new("foo-collection", "Foo Collection"),
        SearchDoc::new("bar-collection", "Bar Collection"),
        SearchDoc::new("baz-collection", "Baz Collection"),
    ])
}

pub fn only_foo_response() -> SearchResponse {
    SearchResponse::new(vec![SearchDoc::new("foo-collection", "Foo Collection")])
}

pub fn config(load_delay_ms: u64) -> CacheConfig {
    CacheConfig {
        load_delay_ms,
        ..CacheConfig::default()
    }
}

pub fn build(search: &Arc<MockSearchService>, config: CacheConfig) -> NameCache {
    init_tracing();
    NameCache::builder(search.clone())
        .config(config)
        .build()
        .expect("valid config")
}
