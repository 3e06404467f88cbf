//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use menagerie::config::ServiceConfig;
use menagerie::lifecycle::Shutdown;
use menagerie::store::{Backend, BackendError, Conditions, MemoryBackend, Row};
use menagerie::{HttpServer, RecordStore};
use sdk_rust::ResourceClient;
use tokio::net::TcpListener;

pub const SECRET: &str = "integration-secret";

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn client(&self) -> ResourceClient {
        ResourceClient::new(&format!("http://{}", self.addr), SECRET)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.auth.credential = SECRET.into();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// Start the real server over `backend` with `config`.
pub async fn start_server(config: ServiceConfig, backend: Arc<dyn Backend>) -> TestServer {
    backend
        .ensure_tables(&menagerie::resources::ResourceKind::tables())
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, RecordStore::new(backend));
    let signalled = shutdown.signalled();

    tokio::spawn(async move {
        let _ = server.run(listener, signalled).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;
    TestServer { addr, shutdown }
}

#[allow(dead_code)]
pub async fn start_memory_server() -> TestServer {
    start_server(test_config(), Arc::new(MemoryBackend::default())).await
}

/// Counts every backend call before delegating.
#[derive(Default)]
pub struct CountingBackend {
    pub inner: MemoryBackend,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl CountingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for CountingBackend {
    async fn create(&self, table: &str, row: Row) -> Result<u64, BackendError> {
        self.tick();
        self.inner.create(table, row).await
    }

    async fn read_where(&self, table: &str, conditions: &Conditions) -> Result<Vec<Row>, BackendError> {
        self.tick();
        self.inner.read_where(table, conditions).await
    }

    async fn update_where(&self, table: &str, conditions: &Conditions, fields: Row) -> Result<u64, BackendError> {
        self.tick();
        self.inner.update_where(table, conditions, fields).await
    }

    async fn delete_where(&self, table: &str, conditions: &Conditions) -> Result<u64, BackendError> {
        self.tick();
        self.inner.delete_where(table, conditions).await
    }

    async fn ensure_tables(&self, tables: &[&str]) -> Result<(), BackendError> {
        self.inner.ensure_tables(tables).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Sleeps before every read so handlers outlive short deadlines.
pub struct SlowBackend {
    pub inner: MemoryBackend,
    pub delay: Duration,
}

#[async_trait]
impl Backend for SlowBackend {
    async fn create(&self, table: &str, row: Row) -> Result<u64, BackendError> {
        self.inner.create(table, row).await
    }

    async fn read_where(&self, table: &str, conditions: &Conditions) -> Result<Vec<Row>, BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.read_where(table, conditions).await
    }

    async fn update_where(&self, table: &str, conditions: &Conditions, fields: Row) -> Result<u64, BackendError> {
        self.inner.update_where(table, conditions, fields).await
    }

    async fn delete_where(&self, table: &str, conditions: &Conditions) -> Result<u64, BackendError> {
        self.inner.delete_where(table, conditions).await
    }

    async fn ensure_tables(&self, tables: &[&str]) -> Result<(), BackendError> {
        self.inner.ensure_tables(tables).await
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Every data call fails as if the database were gone.
pub struct FailingBackend;

#[async_trait]
impl Backend for FailingBackend {
    async fn create(&self, _table: &str, _row: Row) -> Result<u64, BackendError> {
        Err(BackendError::Unavailable("connection refused".into()))
    }

    async fn read_where(&self, _table: &str, _conditions: &Conditions) -> Result<Vec<Row>, BackendError> {
        Err(BackendError::Unavailable("connection refused".into()))
    }

    async fn update_where(&self, _table: &str, _conditions: &Conditions, _fields: Row) -> Result<u64, BackendError> {
        Err(BackendError::Unavailable("connection refused".into()))
    }

    async fn delete_where(&self, _table: &str, _conditions: &Conditions) -> Result<u64, BackendError> {
        Err(BackendError::Unavailable("connection refused".into()))
    }

    async fn ensure_tables(&self, _tables: &[&str]) -> Result<(), BackendError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
