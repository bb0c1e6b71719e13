//! Integration tests for the remote catalog service
//!
//! This test module covers:
//! - Mirroring catalog listings into the library
//! - HTTP failures and timeouts mapped to task errors
//! - Timer-driven refreshes reaching UI sessions

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use hearth_server::catalog::RemoteCatalog;
use hearth_server::library::MemoryLibrary;
use hearth_server::UiUpdates;
use hearth_task_processor::jobs::OnlineRefreshSchedule;
use hearth_task_processor::{CancellationToken, OnlineService, TaskError, TaskProcessor};
use hearth_test_utils::ManualTimer;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::manager;

fn listing(urls: &[&str]) -> serde_json::Value {
    json!({
        "items": urls
            .iter()
            .map(|url| json!({ "title": format!("Title of {}", url), "url": url }))
            .collect::<Vec<_>>()
    })
}

async fn catalog_server(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn catalog(server: &MockServer, library: &Arc<MemoryLibrary>) -> RemoteCatalog {
    RemoteCatalog::new(
        "catalog",
        format!("{}/items.json", server.uri()),
        library.clone(),
    )
    .unwrap()
}

async fn wait_for_idle(processor: &TaskProcessor) {
    for _ in 0..200 {
        if processor.queue_len() == 0 && processor.current_task().is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task processor did not go idle");
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_refresh_mirrors_new_items_once() {
    let server = catalog_server(listing(&["http://media/1", "http://media/2"])).await;
    let library = Arc::new(MemoryLibrary::new());
    let service = catalog(&server, &library);

    let changed = service.refresh(&CancellationToken::new()).await.unwrap();
    let container = library.service_container_id("catalog").unwrap();
    assert_eq!(changed, vec![container]);
    assert_eq!(library.online_item_count(), 2);

    let changed = service.refresh(&CancellationToken::new()).await.unwrap();
    assert!(changed.is_empty());
    assert_eq!(library.online_item_count(), 2);
}

#[tokio::test]
async fn test_cancelled_refresh_adds_nothing() {
    let server = catalog_server(listing(&["http://media/1"])).await;
    let library = Arc::new(MemoryLibrary::new());
    let service = catalog(&server, &library);

    let token = CancellationToken::new();
    token.cancel();

    assert!(service.refresh(&token).await.unwrap().is_empty());
    assert_eq!(library.online_item_count(), 0);
}

#[tokio::test]
async fn test_zero_interval_means_on_demand_only() {
    let server = catalog_server(listing(&[])).await;
    let library = Arc::new(MemoryLibrary::new());

    assert_eq!(catalog(&server, &library).refresh_interval(), None);
    assert_eq!(
        catalog(&server, &library).every(Duration::ZERO).refresh_interval(),
        None
    );
    assert_eq!(
        catalog(&server, &library)
            .every(Duration::from_secs(600))
            .refresh_interval(),
        Some(Duration::from_secs(600))
    );
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_server_error_is_an_online_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let library = Arc::new(MemoryLibrary::new());

    let err = catalog(&server, &library)
        .refresh(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(err, TaskError::OnlineService { ref service, ref message } => {
        assert_eq!(service, "catalog");
        assert!(message.contains("503"));
    });
}

#[tokio::test]
async fn test_malformed_listing_is_an_online_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;
    let library = Arc::new(MemoryLibrary::new());

    let err = catalog(&server, &library)
        .refresh(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(err, TaskError::OnlineService { .. });
}

#[tokio::test]
async fn test_slow_catalog_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(&["http://media/1"]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let library = Arc::new(MemoryLibrary::new());
    let service = RemoteCatalog::with_timeout(
        "catalog",
        format!("{}/items.json", server.uri()),
        library.clone(),
        Duration::from_millis(100),
    )
    .unwrap();

    let err = service.refresh(&CancellationToken::new()).await.unwrap_err();

    assert_matches!(err, TaskError::ServiceTimeout { ref service } if service == "catalog");
    assert_eq!(library.online_item_count(), 0);
}

// =============================================================================
// Scheduled refresh
// =============================================================================

#[tokio::test]
async fn test_timer_tick_refreshes_catalog_into_sessions() {
    let server = catalog_server(listing(&["http://media/1"])).await;
    let library = Arc::new(MemoryLibrary::new());
    let (sessions, _session_timer) = manager();
    let session = sessions.create_session(60).unwrap();
    session.set_logged_in(true);

    let timer = Arc::new(ManualTimer::new());
    let processor = TaskProcessor::start();
    let schedule = OnlineRefreshSchedule::new(
        processor.clone(),
        Arc::new(catalog(&server, &library).every(Duration::from_secs(3600))),
        Arc::new(sessions.clone()),
        timer.clone(),
    );
    assert!(schedule.start());

    assert_eq!(timer.fire(), 1);
    wait_for_idle(&processor).await;

    let container = library.service_container_id("catalog").unwrap();
    assert_eq!(session.take_ui_update_ids(), UiUpdates::Ids(vec![container]));
    assert!(schedule.is_armed());
    assert_eq!(timer.subscribe_calls(), 2);

    schedule.stop();
    processor.shutdown().await;
    assert_eq!(timer.subscription_count(), 0);
}

#[tokio::test]
async fn test_failed_refresh_keeps_schedule_armed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let library = Arc::new(MemoryLibrary::new());
    let (sessions, _session_timer) = manager();

    let timer = Arc::new(ManualTimer::new());
    let processor = TaskProcessor::start();
    let schedule = OnlineRefreshSchedule::new(
        processor.clone(),
        Arc::new(catalog(&server, &library).every(Duration::from_secs(60))),
        Arc::new(sessions),
        timer.clone(),
    );
    schedule.start();

    schedule.refresh_now(false);
    wait_for_idle(&processor).await;

    assert!(schedule.is_armed());
    assert_eq!(library.online_item_count(), 0);
    processor.shutdown().await;
}
