//! Shared response helpers for route handlers.

use serde::Serialize;
use serde_json::json;

/// Transport-agnostic response: an HTTP status and a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                Self::server_error()
            }
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }).to_string(),
        }
    }

    /// Generic 500. Details stay in the log.
    pub fn server_error() -> Self {
        Self::error(500, "Server error")
    }

    pub fn not_found() -> Self {
        Self::error(404, "route not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::error(405, "method not allowed")
    }
}
