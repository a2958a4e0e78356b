//! Shared helpers for integration tests

use std::sync::Arc;
use std::time::Duration;

use roomlet::api::ApiClient;
use roomlet::config::ApiConfig;
use roomlet::storage::{MemoryStore, SessionStore};

/// Client against `base_url` backed by a fresh in-memory store
#[allow(dead_code)]
pub fn memory_client(base_url: &str, token: Option<&str>) -> (ApiClient, Arc<SessionStore>) {
    memory_client_with_timeout(base_url, token, 5)
}

/// Same as [`memory_client`] with an explicit request timeout
#[allow(dead_code)]
pub fn memory_client_with_timeout(
    base_url: &str,
    token: Option<&str>,
    timeout_seconds: u64,
) -> (ApiClient, Arc<SessionStore>) {
    let store = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
    if let Some(token) = token {
        store.set_token(token).expect("failed to seed token");
    }
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_seconds,
    };
    let client = ApiClient::new(&config, Arc::clone(&store)).expect("failed to build client");
    (client, store)
}

/// Poll `check` until it holds or five seconds pass
#[allow(dead_code)]
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..500 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
