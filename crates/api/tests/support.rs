//! Shared fixtures for application-layer integration tests.

use std::sync::Arc;
use std::time::Duration;

use satchel_domain::config::{Config, HttpConfig, StorageConfig, SyncConfig};
use satchel_domain::{EngineEvent, RequestDescriptor};
use satchel_lib::AppContext;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Config pointed at `base_url`, storing under `dir`, with test-friendly
/// network settings (single attempt, short timeout, no periodic sync).
pub fn test_config(dir: &TempDir, base_url: &str) -> Config {
    Config {
        http: HttpConfig {
            base_url: Some(base_url.to_string()),
            timeout_secs: 2,
            max_attempts: 1,
            base_backoff_ms: 1,
        },
        storage: StorageConfig { data_dir: dir.path().to_path_buf() },
        sync: SyncConfig { interval_seconds: 3600, enabled: true },
        ..Config::default()
    }
}

/// A fully wired context over a tempdir. The engine lifecycle has not run;
/// tests drive `initialize` / `take_ownership` themselves.
pub async fn create_test_context(dir: &TempDir, base_url: &str) -> Arc<AppContext> {
    let context =
        AppContext::new(test_config(dir, base_url)).await.expect("failed to create test context");
    Arc::new(context)
}

/// POST request descriptor with a JSON body.
pub fn post(url: &str, body: &str) -> RequestDescriptor {
    let mut request = RequestDescriptor::get(url);
    request.method = "POST".to_string();
    request.body = Some(body.to_string());
    request
}

/// Wait until the subscription yields an event matching `predicate`;
/// panics if none arrives within the test budget.
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<EngineEvent>,
    predicate: impl Fn(&EngineEvent) -> bool,
) -> EngineEvent {
    for _ in 0..50 {
        match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
            Ok(Ok(event)) if predicate(&event) => return event,
            // unrelated event, lag, or nothing yet: keep looking
            Ok(_) | Err(_) => continue,
        }
    }
    panic!("expected engine event never arrived");
}
