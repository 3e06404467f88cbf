//! Resource kinds and their handlers.
//!
//! # Data Flow
//! ```text
//! route (kind fixed at registration)
//!     → handlers.rs (generic over R: Resource)
//!     → fields.rs (typed patch table for R)
//!     → RecordStore (R: Record)
//! ```
//!
//! # Design Decisions
//! - The set of kinds is closed (`ResourceKind`); a route can never name an
//!   unregistered kind
//! - Per-kind behavior (validation, patchable fields, cloning) lives on the
//!   `Resource` trait and is resolved at compile time

pub mod animal;
pub mod fields;
pub mod handlers;
pub mod person;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::Record;

pub use animal::Animal;
pub use fields::{Field, Setter};
pub use person::Person;

/// The managed entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Person,
    Animal,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Person, ResourceKind::Animal];

    /// Path segment and table name.
    pub fn segment(self) -> &'static str {
        match self {
            ResourceKind::Person => "person",
            ResourceKind::Animal => "animal",
        }
    }

    /// Human-readable name used in response messages.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Person => "Person",
            ResourceKind::Animal => "Animal",
        }
    }

    /// Backend tables for every kind.
    pub fn tables() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.segment()).collect()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// One reason a record failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub category: &'static str,
    pub reason: String,
}

impl Violation {
    pub fn empty_field(field: &str) -> Self {
        Self {
            category: "EmptyField",
            reason: format!("{field} is required"),
        }
    }

    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self {
            category: "InvalidValue",
            reason: reason.into(),
        }
    }

    pub fn unknown_field(field: &str) -> Self {
        Self {
            category: "UnknownField",
            reason: format!("{field} is not editable"),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.reason)
    }
}

/// A storable entity served under `/{kind}/`.
pub trait Resource: Record + Clone + fmt::Debug {
    const KIND: ResourceKind;

    /// Fields a PATCH may set, with their typed setters.
    fn fields() -> &'static [Field<Self>];

    /// Assign the identity and reset server-owned state on a new record.
    fn prepare_new(&mut self, id: String);

    /// Force the identity of a record being written under `id`.
    fn set_id(&mut self, id: String);

    /// Semantic checks run before every write.
    fn validate(&self) -> Result<(), Vec<Violation>>;

    /// A copy under a fresh id that remembers its source.
    fn duplicate(&self, new_id: String) -> Self;
}

/// Checks shared by every kind.
pub(crate) fn validate_common(
    expected: ResourceKind,
    id: &str,
    kind: ResourceKind,
    name: &str,
) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    if name.trim().is_empty() {
        violations.push(Violation::empty_field("name"));
    }
    if id.is_empty() {
        violations.push(Violation::empty_field("id"));
    }
    if kind != expected {
        violations.push(Violation::invalid_value(format!(
            "kind must be `{expected}`, got `{kind}`"
        )));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
