//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the shared application state
//! - Build the Axum router from the route table
//! - Apply router-wide limits (request body size)
//! - Serve until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::ServiceConfig;
use crate::resilience::{Dispatcher, TimeoutPolicy};
use crate::routing::build_routes;
use crate::security::Authorizer;
use crate::store::RecordStore;

/// Application state injected into every route.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub authorizer: Arc<Authorizer>,
    pub dispatcher: Dispatcher,
    pub policy: Arc<TimeoutPolicy>,
}

impl AppState {
    pub fn new(config: &ServiceConfig, store: RecordStore) -> Self {
        Self {
            store,
            authorizer: Arc::new(Authorizer::from_config(&config.auth)),
            dispatcher: Dispatcher::new(),
            policy: Arc::new(TimeoutPolicy::from_config(&config.timeouts)),
        }
    }
}

/// HTTP server for the record service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and store.
    pub fn new(config: ServiceConfig, store: RecordStore) -> Self {
        let state = AppState::new(&config, store);
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        build_routes(state).layer(RequestBodyLimitLayer::new(config.security.max_body_size))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` resolves. In-flight requests are drained first.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = ?self.config.storage.backend,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
