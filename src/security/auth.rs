//! Shared-secret authorization middleware.
//! Third layer of the chain; a mismatch short-circuits before dispatch.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::error::ServiceError;
use crate::http::response::Envelope;
use crate::observability::metrics;

/// Compares one request header against a single expected value.
#[derive(Debug, Clone)]
pub struct Authorizer {
    header: HeaderName,
    credential: Vec<u8>,
}

impl Authorizer {
    pub fn new(header: HeaderName, credential: impl Into<String>) -> Self {
        Self {
            header,
            credential: credential.into().into_bytes(),
        }
    }

    /// Header names were checked by config validation; an invalid one falls
    /// back to `authorization`.
    pub fn from_config(config: &AuthConfig) -> Self {
        let header = HeaderName::from_bytes(config.header.trim().as_bytes())
            .unwrap_or(axum::http::header::AUTHORIZATION);
        Self::new(header, config.credential.clone())
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Exact, constant-time match. A missing header never matches.
    pub fn is_authorized<B>(&self, req: &Request<B>) -> bool {
        match req.headers().get(&self.header) {
            Some(value) => bool::from(value.as_bytes().ct_eq(&self.credential)),
            None => false,
        }
    }
}

pub async fn authorize(State(auth): State<Arc<Authorizer>>, req: Request<Body>, next: Next) -> Response {
    if !auth.is_authorized(&req) {
        tracing::error!(header = %auth.header(), "Unauthorized request");
        metrics::record_unauthorized();
        return Envelope::from(ServiceError::Unauthorized).into_response();
    }

    tracing::info!("Authorization successful");
    next.run(req).await
}
