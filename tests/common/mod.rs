//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use conduit_api::config::{AppConfig, Environment};
use conduit_api::database::{DatabaseError, DocumentStore};
use conduit_api::{AppState, ServerBuilder, ServerHandle};

/// In-memory stand-in for the database connection.
pub struct FakeStore {
    healthy: AtomicBool,
    closed: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(true),
            closed: AtomicUsize::new(0),
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    fn target(&self) -> &str {
        "fake://"
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DatabaseError::Unavailable("connection refused".into()))
        }
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loopback config on an ephemeral port with no static directory.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.http.static_dir = "target/no-static-files".to_string();
    config
}

pub fn production_config() -> AppConfig {
    let mut config = test_config();
    config.environment = Environment::Production;
    config
}

/// Start a server backed by a [`FakeStore`].
pub async fn start_server(
    config: AppConfig,
    routes: Router<AppState>,
) -> (ServerHandle, Arc<FakeStore>) {
    let store = FakeStore::new();
    let handle = ServerBuilder::new(config)
        .routes(routes)
        .start_with_store(store.clone())
        .await
        .expect("server failed to start");
    (handle, store)
}

pub fn url(handle: &ServerHandle, path: &str) -> String {
    format!("http://{}{}", handle.local_addr(), path)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
