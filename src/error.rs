//! Service error taxonomy and its single mapping onto HTTP envelopes.

use axum::http::StatusCode;

use crate::http::response::{Envelope, TIMEOUT_MESSAGE, UNAUTHORIZED_MESSAGE};
use crate::resources::Violation;
use crate::store::StoreError;

/// Every failure a request can end in.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The client payload or path was malformed.
    #[error("{0}")]
    Parse(String),

    /// A field value was well-formed but semantically invalid.
    #[error("Validation error: {}", join(.0))]
    Validation(Vec<Violation>),

    #[error("{kind} with ID {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Backend fault or a write that affected nothing.
    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: StoreError,
    },

    /// A failure inside the service itself (encoding, a panicked handler).
    #[error("{0}")]
    Internal(String),

    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    pub fn validation(violation: Violation) -> Self {
        ServiceError::Validation(vec![violation])
    }

    /// Wrap a store failure raised while doing `context`.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::Cancelled { .. } => ServiceError::Timeout,
            source => ServiceError::Persistence {
                context: context.into(),
                source,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Parse(_) | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Persistence { .. } | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl From<ServiceError> for Envelope {
    fn from(err: ServiceError) -> Self {
        Envelope::text(err.status(), err.to_string())
    }
}
