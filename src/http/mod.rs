//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body limit)
//!     → request.rs (request context, correlation id, request span)
//!     → [logging, authorization, dispatch]
//!     → response.rs (envelope → HTTP response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, RequestId, X_REQUEST_ID};
pub use response::Envelope;
pub use server::{AppState, HttpServer};
