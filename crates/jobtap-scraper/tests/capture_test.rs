mod common;

use common::{MockResponse, MockSite};
use jobtap_browser::BrowserActions;
use jobtap_core::{ScrapingConfig, TargetConfig};
use jobtap_scraper::{CaptureBuffer, CaptureCursor, ResponseFilter};
use std::sync::Arc;
use std::time::Duration;

async fn attach(site: &Arc<MockSite>, config: &ScrapingConfig) -> CaptureBuffer {
    let actions: Arc<dyn BrowserActions> = site.clone();
    CaptureBuffer::attach(
        actions,
        ResponseFilter::from_target(&TargetConfig::default()),
        config,
    )
    .await
    .expect("attach")
}

/// Let the listener task work through everything queued.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_captures_only_matching_responses() {
    let site = MockSite::new().into_arc();
    let capture = attach(&site, &ScrapingConfig::default()).await;

    site.emit(vec![
        MockResponse::count(),
        MockResponse::asset(),
        MockResponse::page(&["a"]).with_status(500),
        MockResponse::failing(),
        MockResponse::page(&["b"]),
    ]);
    settle().await;

    assert_eq!(capture.body_count(), 1);
    assert_eq!(common::sorted_ids(&capture.snapshot_all()), vec!["b"]);
}

#[tokio::test(start_paused = true)]
async fn test_completion_before_response_is_still_captured() {
    let site = MockSite::new().into_arc();
    let mut capture = attach(&site, &ScrapingConfig::default()).await;

    site.emit(vec![MockResponse::page(&["early"]).finishing_first()]);

    assert!(capture.wait_for_signal(Duration::from_secs(1)).await);
    assert_eq!(common::sorted_ids(&capture.snapshot_all()), vec!["early"]);
    assert_eq!(capture.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transport_base64_bodies_are_decoded() {
    let site = MockSite::new().into_arc();
    let mut capture = attach(&site, &ScrapingConfig::default()).await;

    site.emit(vec![MockResponse::page(&["enc"]).transport_base64()]);

    assert!(capture.wait_for_signal(Duration::from_secs(1)).await);
    assert_eq!(common::sorted_ids(&capture.snapshot_all()), vec!["enc"]);
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_without_captures() {
    let site = MockSite::new().into_arc();
    let mut capture = attach(&site, &ScrapingConfig::default()).await;

    site.emit(vec![MockResponse::count()]);
    assert!(!capture.wait_for_signal(Duration::from_secs(8)).await);
}

#[tokio::test(start_paused = true)]
async fn test_full_signal_channel_never_blocks_capture() {
    let site = MockSite::new().into_arc();
    let config = ScrapingConfig {
        signal_capacity: 1,
        ..ScrapingConfig::default()
    };
    let mut capture = attach(&site, &config).await;

    site.emit(vec![
        MockResponse::page(&["a"]),
        MockResponse::page(&["b"]),
        MockResponse::page(&["c"]),
    ]);
    settle().await;

    assert_eq!(capture.body_count(), 3);
    assert!(capture.wait_for_signal(Duration::from_secs(1)).await);
    assert!(
        !capture.wait_for_signal(Duration::from_secs(1)).await,
        "overflowing wake-ups are dropped"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cursor_only_returns_new_bodies() {
    let site = MockSite::new().into_arc();
    let capture = attach(&site, &ScrapingConfig::default()).await;
    let mut cursor = CaptureCursor::default();

    site.emit(vec![MockResponse::page(&["a", "b"])]);
    settle().await;
    assert_eq!(common::sorted_ids(&capture.snapshot_new_since(&mut cursor)), vec!["a", "b"]);
    assert_eq!(cursor.position(), 1);

    assert!(capture.snapshot_new_since(&mut cursor).is_empty());

    site.emit(vec![MockResponse::page(&["c"])]);
    settle().await;
    assert_eq!(common::sorted_ids(&capture.snapshot_new_since(&mut cursor)), vec!["c"]);
    assert_eq!(capture.snapshot_all().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_bodies_are_skipped() {
    let site = MockSite::new().into_arc();
    let capture = attach(&site, &ScrapingConfig::default()).await;

    site.emit(vec![
        MockResponse::search("<html>rate limited</html>"),
        MockResponse::page(&["ok"]),
    ]);
    settle().await;

    assert_eq!(capture.body_count(), 2);
    assert_eq!(common::sorted_ids(&capture.snapshot_all()), vec!["ok"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_body_fetch_is_dropped() {
    let site = MockSite::new().into_arc();
    let capture = attach(&site, &ScrapingConfig::default()).await;

    // the pair completes, the fetch fails, nothing is left behind
    site.emit(vec![MockResponse::failing()]);
    settle().await;
    assert_eq!(capture.pending_count(), 0);
    assert_eq!(capture.body_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_buffer_stops_listening() {
    let site = MockSite::new().into_arc();
    let capture = attach(&site, &ScrapingConfig::default()).await;
    drop(capture);
    settle().await;

    // emitting after the buffer is gone is harmless
    site.emit(vec![MockResponse::page(&["late"])]);
    settle().await;

    let fresh = attach(&site, &ScrapingConfig::default()).await;
    assert_eq!(fresh.body_count(), 0);
    assert_eq!(site.subscriptions(), 2);
}
