mod common;

use common::{ready_session, MockResponse, MockSite};
use jobtap_core::{CacheConfig, SessionState};
use jobtap_scraper::{ResultCache, ScrapeError};
use std::sync::Arc;
use std::time::Duration;

async fn cache_over(site: &Arc<MockSite>) -> ResultCache {
    let session = ready_session(site).await;
    ResultCache::new(session, CacheConfig::default().ttl())
}

#[tokio::test(start_paused = true)]
async fn test_repeat_query_is_served_from_cache() {
    let site = MockSite::new()
        .on_submit(vec![MockResponse::page(&["a", "b"])])
        .into_arc();
    let cache = cache_over(&site).await;

    let first = cache.search("rust").await.expect("first");
    let second = cache.search("rust").await.expect("second");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.scraped, 2);
    assert_eq!(site.submits(), 1);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_refreshed() {
    let site = MockSite::new()
        .on_submit(vec![MockResponse::page(&["a"])])
        .on_submit(vec![MockResponse::page(&["a", "b"])])
        .into_arc();
    let cache = cache_over(&site).await;

    cache.search("rust").await.expect("first");
    tokio::time::advance(Duration::from_secs(16 * 60)).await;
    let refreshed = cache.search("rust").await.expect("refreshed");

    assert_eq!(refreshed.scraped, 2);
    assert_eq!(site.submits(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_queries_scrape_once() {
    let site = MockSite::new()
        .on_submit(vec![MockResponse::page(&["a"])])
        .on_submit(vec![MockResponse::page(&["never"])])
        .into_arc();
    let cache = cache_over(&site).await;

    let (left, right) = tokio::join!(cache.search("rust"), cache.search("rust"));

    assert!(Arc::ptr_eq(&left.unwrap(), &right.unwrap()));
    assert_eq!(site.submits(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_queries_are_cached_separately() {
    let site = MockSite::new()
        .on_submit(vec![MockResponse::page(&["a"])])
        .on_submit(vec![MockResponse::page(&["b"])])
        .into_arc();
    let cache = cache_over(&site).await;

    let rust = cache.search("rust").await.expect("rust");
    let go = cache.search("go").await.expect("go");

    assert_eq!(common::sorted_ids(&rust.jobs), vec!["a"]);
    assert_eq!(common::sorted_ids(&go.jobs), vec!["b"]);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_distinct_queries_take_turns() {
    let site = MockSite::new()
        .on_submit(vec![MockResponse::page(&["a"])])
        .on_submit(vec![MockResponse::page(&["b"])])
        .into_arc();
    let cache = cache_over(&site).await;

    let (rust, go) = tokio::join!(cache.search("rust"), cache.search("go"));

    assert_eq!(common::sorted_ids(&rust.expect("rust").jobs), vec!["a"]);
    assert_eq!(common::sorted_ids(&go.expect("go").jobs), vec!["b"]);
    assert_eq!(site.submits(), 2);
    assert_eq!(
        site.interactions(),
        vec!["subscribe", "type rust", "enter", "subscribe", "type go", "enter"],
        "the second search starts only after the first finished"
    );
    assert_eq!(cache.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_not_cached() {
    let site = MockSite::new()
        .on_submit(vec![])
        .on_submit(vec![MockResponse::page(&["a"])])
        .into_arc();
    let cache = cache_over(&site).await;

    let err = cache.search("rust").await.unwrap_err();
    assert!(matches!(err, ScrapeError::Timeout { .. }));
    assert!(cache.is_empty().await);

    let result = cache.search("rust").await.expect("retry");
    assert_eq!(result.scraped, 1);
    assert_eq!(cache.session_state().await, SessionState::Ready);
}
