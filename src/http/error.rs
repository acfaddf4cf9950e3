//! API error type and its HTTP mapping.
//!
//! Every error leaves the server as `{"detail": "..."}` with a matching status.
//! Internal error details are logged, never returned.

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors produced while dispatching a request to a resource handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No route or no record matched (404).
    #[error("Not found.")]
    NotFound,

    /// The path matched but the method did not (405).
    #[error("Method \"{method}\" not allowed.")]
    MethodNotAllowed { method: Method, allowed: Vec<Method> },

    /// The request body was malformed or failed validation (400).
    #[error("{0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit (413).
    #[error("Request body exceeds {limit} bytes.")]
    PayloadTooLarge { limit: usize },

    /// Unexpected failure inside a handler (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let detail = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "A server error occurred.".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();

        if let Self::MethodNotAllowed { allowed, .. } = &self {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = ApiError::MethodNotAllowed {
            method: Method::DELETE,
            allowed: vec![Method::GET, Method::POST, Method::HEAD],
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST, HEAD");
    }

    #[test]
    fn test_internal_message_is_not_leaked() {
        let err = ApiError::Internal("db password rejected".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Display keeps the cause for logs; the response body does not.
        assert!(err.to_string().contains("db password"));
    }
}
