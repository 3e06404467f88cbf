//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → tower_http body limit (reject oversized bodies)
//!     → auth.rs (shared-secret header check)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Credentials are compared in constant time

pub mod auth;

pub use auth::{authorize, Authorizer};
