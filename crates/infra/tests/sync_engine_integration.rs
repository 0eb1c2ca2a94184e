//! Integration tests for action replay over real HTTP
//!
//! **Purpose**: Exercise the capture → persist → replay loop end to end:
//! the queue holding real captured mutations, the sync engine replaying
//! them against a live origin, and the worker reacting to connectivity.
//!
//! **Coverage:**
//! - Mixed replay passes: accepted, rejected, and bodiless actions
//! - Offline compose drains automatically once connectivity returns
//! - Pending actions survive a process restart and replay afterwards
//!
//! **Infrastructure:**
//! - WireMock HTTP server
//! - Real snapshot-backed stores (tempdir)

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::collections::BTreeMap;
use std::time::Duration;

use satchel_core::ActionQueue;
use satchel_domain::{OfflineAction, RequestDescriptor};
use satchel_infra::{SyncOutcome, SyncWorker, SyncWorkerConfig};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn compose(url: &str, body: &str) -> OfflineAction {
    OfflineAction::new("POST", url, BTreeMap::new(), Some(body.to_string()))
}

/// Wait for the queue to drain; panics if replay never happens.
///
/// A pass empties the queue up front and replays afterwards, so an empty
/// queue alone does not mean the replay (and its events) happened yet; a
/// completed pass is recorded in the metrics only after it finishes.
async fn wait_for_drain(stack: &support::TestStack) {
    for _ in 0..50 {
        if stack.metrics.snapshot().sync_passes > 0 && stack.queue.size().await.unwrap() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("queued actions were never replayed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mixed_replay_over_real_http() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/messages/send"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/drafts"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/messages/9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let stack = support::build_stack(&dir, &server.uri(), false).await;

    let send = compose("/api/messages/send", r#"{"to":"a@example.com"}"#);
    let draft = compose("/api/drafts", r#"{"subject":"wip"}"#);
    let purge = OfflineAction::new("DELETE", "/api/messages/9", BTreeMap::new(), None);
    stack.queue.enqueue(send.clone()).await.unwrap();
    stack.queue.enqueue(draft.clone()).await.unwrap();
    stack.queue.enqueue(purge.clone()).await.unwrap();

    let outcome = stack.engine.run_sync_pass().await.unwrap();
    assert_eq!(outcome, SyncOutcome::Completed { synced: 2, requeued: 1, dead_lettered: 0 });

    // Only the rejected draft stays queued, with a recorded attempt
    let remaining = stack.queue.dequeue_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, draft.id);
    assert_eq!(remaining[0].attempts, 1);

    // Listeners heard about the replays in capture order
    assert_eq!(stack.sink.synced_ids(), vec![send.id, purge.id]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_offline_compose_replays_on_reconnect() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/messages/send"))
        .and(body_string_contains("while offline"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let stack = support::build_stack(&dir, &server.uri(), false).await;
    stack.connectivity.set_online(false);

    // Compose while offline: the router captures instead of sending
    let mut request = RequestDescriptor::get("/api/messages/send");
    request.method = "POST".to_string();
    request.body = Some(r#"{"subject":"written while offline"}"#.to_string());
    let captured = stack.router.handle(request).await.unwrap();
    assert_eq!(captured.status, 202);
    assert_eq!(stack.queue.size().await.unwrap(), 1);

    let config = SyncWorkerConfig { periodic_enabled: false, ..SyncWorkerConfig::default() };
    let mut worker =
        SyncWorker::new(stack.engine.clone(), stack.connectivity.clone(), config);
    worker.start().await.unwrap();

    // Connectivity returns; the worker notices and drains the queue
    stack.connectivity.set_online(true);
    wait_for_drain(&stack).await;
    assert_eq!(stack.sink.synced_ids().len(), 1);

    worker.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_preserves_pending_actions() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/messages/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/messages/3/read"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let send = compose("/api/messages/send", r#"{"to":"c@example.com"}"#);
    let mark = OfflineAction::new("POST", "/api/messages/3/read", BTreeMap::new(), None);

    // First session captures two actions and shuts down before syncing
    {
        let stack = support::build_stack(&dir, &server.uri(), false).await;
        stack.queue.enqueue(send.clone()).await.unwrap();
        stack.queue.enqueue(mark.clone()).await.unwrap();
    }

    // Second session over the same directory replays what the first queued
    let stack = support::build_stack(&dir, &server.uri(), false).await;
    assert_eq!(stack.queue.size().await.unwrap(), 2);

    let outcome = stack.engine.run_sync_pass().await.unwrap();
    assert_eq!(outcome, SyncOutcome::Completed { synced: 2, requeued: 0, dead_lettered: 0 });
    assert_eq!(stack.queue.size().await.unwrap(), 0);
    assert_eq!(stack.sink.synced_ids(), vec![send.id, mark.id]);
}
