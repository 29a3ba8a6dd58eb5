mod common;

use collection_name_cache::CacheConfig;
use common::{build, full_response, MockSearchService};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn prunes_entries_past_max_age() {
    let search = MockSearchService::with_response(full_response());
    let cache = build(
        &search,
        CacheConfig {
            load_delay_ms: 25,
            prune_interval_ms: 20,
            max_age_ms: 80,
            ..CacheConfig::default()
        },
    );

    cache
        .preload(["foo-collection", "bar-collection", "baz-collection"])
        .await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(search.call_count(), 1);

    sleep(Duration::from_millis(50)).await;
    cache.lookup("foo-collection").await;
    assert_eq!(search.call_count(), 1);

    // Long enough for the periodic pass to drop everything.
    sleep(Duration::from_millis(150)).await;
    assert!(cache.is_empty());

    assert_eq!(
        cache.lookup("foo-collection").await.as_deref(),
        Some("Foo Collection")
    );
    assert_eq!(search.call_count(), 2);
    assert!(cache.stats().pruned >= 3);
}

#[tokio::test(start_paused = true)]
async fn access_keeps_entries_alive() {
    let search = MockSearchService::with_response(full_response());
    let cache = build(
        &search,
        CacheConfig {
            load_delay_ms: 10,
            prune_interval_ms: 20,
            max_age_ms: 100,
            ..CacheConfig::default()
        },
    );

    cache.lookup("foo-collection").await;
    for _ in 0..10 {
        sleep(Duration::from_millis(60)).await;
        cache.lookup("foo-collection").await;
    }

    assert_eq!(search.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn evicts_least_recently_accessed_over_capacity() {
    let search = MockSearchService::with_response(full_response());
    let cache = build(
        &search,
        CacheConfig {
            load_delay_ms: 10,
            prune_interval_ms: 3_600_000,
            max_entries: 2,
            ..CacheConfig::default()
        },
    );

    // The first batch returns all three rows; later reads only touch them.
    cache.lookup("foo-collection").await;
    sleep(Duration::from_millis(50)).await;
    cache.lookup("bar-collection").await;
    sleep(Duration::from_millis(50)).await;
    cache.lookup("baz-collection").await;
    assert_eq!(search.call_count(), 1);
    assert_eq!(cache.len(), 3);

    cache.prune().await;
    assert_eq!(cache.len(), 2);

    cache.lookup("bar-collection").await;
    cache.lookup("baz-collection").await;
    assert_eq!(search.call_count(), 1);

    cache.lookup("foo-collection").await;
    assert_eq!(search.call_count(), 2);
    assert_eq!(
        search.last_params().unwrap().query,
        "identifier:(foo-collection)"
    );
}

#[tokio::test(start_paused = true)]
async fn periodic_pass_enforces_capacity() {
    let search = MockSearchService::with_response(full_response());
    let cache = build(
        &search,
        CacheConfig {
            load_delay_ms: 10,
            prune_interval_ms: 1_000,
            max_entries: 1,
            ..CacheConfig::default()
        },
    );

    cache.lookup("foo-collection").await;
    sleep(Duration::from_millis(5)).await;
    cache.lookup("foo-collection").await;
    assert_eq!(cache.len(), 3);

    sleep(Duration::from_millis(1_100)).await;
    assert_eq!(cache.len(), 1);
    cache.lookup("foo-collection").await;
    assert_eq!(search.call_count(), 1);
}
