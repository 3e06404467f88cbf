//! Response envelopes.
//!
//! # Responsibilities
//! - Model the single terminal (status, payload, content type) of a request
//! - Provide the fixed timeout envelope synthesized by the dispatcher
//! - Convert into an axum `Response` exactly once
//!
//! # Design Decisions
//! - Handlers and the dispatcher return envelopes, never write to a sink, so
//!   a second write cannot be expressed
//! - Plain text for acknowledgements and diagnostics; JSON only for reads

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body message of the timeout envelope.
pub const TIMEOUT_MESSAGE: &str = "Request timed out";

/// Body message of the unauthorized envelope.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Content-type tag of an envelope payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Json,
    None,
}

impl ContentType {
    fn header_value(self) -> Option<HeaderValue> {
        match self {
            ContentType::Text => Some(HeaderValue::from_static("text/plain; charset=utf-8")),
            ContentType::Json => Some(HeaderValue::from_static("application/json; charset=utf-8")),
            ContentType::None => None,
        }
    }
}

/// The terminal response of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: ContentType,
}

impl Envelope {
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Bytes::from(message.into()),
            content_type: ContentType::Text,
        }
    }

    /// Serialize `value` as a JSON payload.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            status,
            body: Bytes::from(serde_json::to_vec(value)?),
            content_type: ContentType::Json,
        })
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: Bytes::new(),
            content_type: ContentType::None,
        }
    }

    pub fn timeout() -> Self {
        Self::text(StatusCode::REQUEST_TIMEOUT, TIMEOUT_MESSAGE)
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(value) = self.content_type.header_value() {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_envelope_response() {
        let response = Envelope::timeout().into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_no_content_has_no_type() {
        let response = Envelope::no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_json_envelope() {
        let env = Envelope::json(StatusCode::OK, &json!({"name": "Ada"})).unwrap();
        assert_eq!(env.content_type, ContentType::Json);
        assert_eq!(env.body_str(), r#"{"name":"Ada"}"#);
    }
}
