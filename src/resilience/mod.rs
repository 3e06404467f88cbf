//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Authorized request:
//!     → TimeoutPolicy (deadline for this route)
//!     → Dispatcher (handler task raced against the deadline)
//!     → handler envelope | 408 envelope | 500 envelope
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every handler has a deadline
//! - Nothing is retried
//! - Late results are observed and dropped, never sent

pub mod timeouts;

pub use timeouts::{Dispatcher, Outcome, TimeoutPolicy};
