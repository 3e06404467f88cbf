//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! ResourceKind::ALL × Operation::ALL
//!     → TimeoutPolicy (deadline per route)
//!     → router.rs (mount decorated handler per verb/path)
//!     → frozen axum Router
//! ```
//!
//! # Design Decisions
//! - Routes are fixed at startup; nothing is registered at runtime
//! - Every route carries the same middleware order
//! - Deterministic: the same request always reaches the same handler

pub mod router;

use std::fmt;
use std::time::Duration;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::resources::ResourceKind;

pub use router::build_routes;

/// What a route does to its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Replace,
    Patch,
    Delete,
    Clone,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Read,
        Operation::Replace,
        Operation::Patch,
        Operation::Delete,
        Operation::Clone,
    ];

    pub fn method(self) -> Method {
        match self {
            Operation::Create | Operation::Clone => Method::POST,
            Operation::Read => Method::GET,
            Operation::Replace => Method::PUT,
            Operation::Patch => Method::PATCH,
            Operation::Delete => Method::DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Replace => "replace",
            Operation::Patch => "patch",
            Operation::Delete => "delete",
            Operation::Clone => "clone",
        }
    }

    /// Whether the operation addresses an existing record by id.
    pub fn targets_item(self) -> bool {
        !matches!(self, Operation::Create)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static facts about one mounted route, known at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    pub resource: ResourceKind,
    pub operation: Operation,
    pub timeout: Duration,
}
