//! Error normalization and classification

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// The uniform error surfaced for every failed request.
///
/// Callers never see a raw transport error: whatever went wrong, the
/// failure arrives as an `ApiError` with a non-empty `message`, the HTTP
/// `status` when a response was received, and the raw server payload in
/// `data` when one was present.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable failure description; never empty
    pub message: String,
    /// HTTP status of the response, absent when no response arrived
    pub status: Option<StatusCode>,
    /// Raw server payload, when one was received
    pub data: Option<Value>,
}

/// Errors raised while constructing a client
#[derive(Debug, Error)]
pub enum BuildError {
    /// Base URL did not parse as an absolute URL
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Invalid proxy configuration
    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(String),

    /// Underlying client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl ApiError {
    /// Build an error from a failed response.
    ///
    /// Message priority: server `message` field, server `error` field,
    /// then a status-derived fallback.
    pub fn from_response(status: StatusCode, payload: Option<Value>) -> Self {
        let message = payload
            .as_ref()
            .and_then(|body| server_message(body))
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        Self {
            message,
            status: Some(status),
            data: payload,
        }
    }

    /// Build an error from a transport failure (timeout, DNS, connection
    /// reset) where no response arrived.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let text = err.to_string();
        Self {
            message: if text.is_empty() {
                "Request failed".to_string()
            } else {
                text
            },
            status: None,
            data: None,
        }
    }

    /// Error for a request that could not be built or a body that could
    /// not be decoded; raised outside the send loop, so never retried.
    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
        }
    }

    /// Error for a 2xx response whose body was not valid JSON.
    pub(crate) fn decode(status: StatusCode, err: serde_json::Error) -> Self {
        Self {
            message: format!("Response body was not valid JSON: {err}"),
            status: Some(status),
            data: None,
        }
    }

    /// Whether the failure is expected to resolve on retry: no response at
    /// all, rate limiting, or a gateway/overload status.
    pub fn is_transient(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => matches!(status.as_u16(), 429 | 502 | 503 | 504),
        }
    }

    /// Whether the failure is an authentication rejection
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED)
    }
}

/// Extract the server-provided message from an error payload.
fn server_message(body: &Value) -> Option<String> {
    for key in ["message", "error"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Log a classified failure. Diagnostics only; callers' control flow never
/// depends on this.
pub(crate) fn log_failure(err: &ApiError) {
    match err.status.map(|s| s.as_u16()) {
        None => warn!(message = %err.message, "network error, no response received"),
        Some(status @ 500..=599) => warn!(status, message = %err.message, "server error"),
        Some(401) => debug!(message = %err.message, "authentication required"),
        Some(403) => warn!(message = %err.message, "permission denied"),
        Some(404) => debug!(message = %err.message, "resource not found"),
        Some(status @ (400 | 422)) => {
            debug!(status, message = %err.message, "request rejected by server")
        }
        Some(status) => debug!(status, message = %err.message, "request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_prefers_server_message_field() {
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            Some(json!({ "message": "Rent amount is required", "error": "validation" })),
        );
        assert_eq!(err.message, "Rent amount is required");
        assert_eq!(err.status, Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_message_falls_back_to_error_field() {
        let err = ApiError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(json!({ "error": "lease dates overlap" })),
        );
        assert_eq!(err.message, "lease dates overlap");
    }

    #[test]
    fn test_message_never_empty() {
        // Every combination of status class and payload shape must yield a
        // non-empty message.
        let payloads = [
            Some(json!({ "message": "boom" })),
            Some(json!({ "error": "bad" })),
            Some(json!({})),
            None,
        ];
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            for payload in &payloads {
                let err = ApiError::from_response(status, payload.clone());
                assert!(!err.message.is_empty(), "empty message for {status}");
            }
        }
    }

    #[test]
    fn test_empty_body_uses_status_fallback() {
        let err = ApiError::from_response(StatusCode::SERVICE_UNAVAILABLE, None);
        assert_eq!(err.message, "Request failed with status 503");
        assert!(err.data.is_none());
    }

    #[test]
    fn test_non_string_message_field_ignored() {
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            Some(json!({ "message": { "nested": true } })),
        );
        assert_eq!(err.message, "Request failed with status 400");
    }

    #[test]
    fn test_payload_preserved_as_data() {
        let payload = json!({ "message": "no", "fields": ["rent_amount"] });
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, Some(payload.clone()));
        assert_eq!(err.data, Some(payload));
    }

    #[test]
    fn test_transient_classification() {
        for status in [429u16, 502, 503, 504] {
            let err = ApiError::from_response(StatusCode::from_u16(status).unwrap(), None);
            assert!(err.is_transient(), "{status} should be transient");
        }
        for status in [400u16, 401, 403, 404, 422, 500] {
            let err = ApiError::from_response(StatusCode::from_u16(status).unwrap(), None);
            assert!(!err.is_transient(), "{status} should not be transient");
        }
    }

    #[test]
    fn test_no_response_is_transient() {
        let err = ApiError {
            message: "connection refused".to_string(),
            status: None,
            data: None,
        };
        assert!(err.is_transient());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_unauthorized_classification() {
        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, None);
        assert!(err.is_unauthorized());
    }
}
