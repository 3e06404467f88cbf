//! Menagerie: a CRUD record service for people and animals.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod resources;
pub mod routing;
pub mod security;
pub mod store;

pub use config::schema::ServiceConfig;
pub use error::ServiceError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use store::RecordStore;
