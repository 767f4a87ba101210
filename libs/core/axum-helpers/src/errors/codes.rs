//! Type-safe error codes for API responses.
//!
//! Each code carries:
//! - a snake_case identifier sent to clients in `error.code`
//! - the OpenAI-style `error.type` category
//! - an integer for logs and dashboards
//! - a default message that is safe to expose
//! - whether a client may retry the same request
//!
//! # Example
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::DimensionMismatch;
//! assert_eq!(code.as_str(), "dimension_mismatch");
//! assert_eq!(code.error_type(), "invalid_request_error");
//! assert_eq!(code.code(), 1003);
//! assert!(!code.is_retryable());
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Request validation failed
    ValidationError,
    /// Requested resource was not found
    NotFound,
    /// Vector length disagrees with the configured dimensionality
    DimensionMismatch,
    /// Bearer token missing or wrong
    Unauthorized,
    /// Request body could not be parsed as the expected JSON
    InvalidJson,
    /// Path identifier is malformed
    InvalidId,
    /// No route or method matched
    RouteNotFound,

    // Storage errors (2000-2999)
    /// The backing store failed
    StorageError,
    /// The backing store did not answer before the deadline
    StorageTimeout,

    // Upstream dependency errors (3000-3999)
    /// The embedding gateway failed
    GatewayError,
    /// The embedding gateway did not answer before the deadline
    GatewayTimeout,

    // Server errors (5000-5999)
    /// An unexpected internal server error occurred
    InternalError,
    /// Service is temporarily unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::NotFound => "not_found",
            Self::DimensionMismatch => "dimension_mismatch",
            Self::Unauthorized => "unauthorized",
            Self::InvalidJson => "invalid_json",
            Self::InvalidId => "invalid_id",
            Self::RouteNotFound => "route_not_found",
            Self::StorageError => "storage_error",
            Self::StorageTimeout => "storage_timeout",
            Self::GatewayError => "gateway_error",
            Self::GatewayTimeout => "gateway_timeout",
            Self::InternalError => "internal_error",
            Self::ServiceUnavailable => "service_unavailable",
        }
    }

    /// Integer code for logging and monitoring.
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::NotFound => 1002,
            Self::DimensionMismatch => 1003,
            Self::Unauthorized => 1004,
            Self::InvalidJson => 1005,
            Self::InvalidId => 1006,
            Self::RouteNotFound => 1007,
            Self::StorageError => 2001,
            Self::StorageTimeout => 2002,
            Self::GatewayError => 3001,
            Self::GatewayTimeout => 3002,
            Self::InternalError => 5001,
            Self::ServiceUnavailable => 5002,
        }
    }

    /// OpenAI-compatible `error.type` value.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ValidationError
            | Self::NotFound
            | Self::DimensionMismatch
            | Self::InvalidJson
            | Self::InvalidId
            | Self::RouteNotFound => "invalid_request_error",
            Self::Unauthorized => "authentication_error",
            Self::GatewayError | Self::GatewayTimeout => "api_error",
            Self::StorageError
            | Self::StorageTimeout
            | Self::InternalError
            | Self::ServiceUnavailable => "server_error",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::NotFound => "Resource not found",
            Self::DimensionMismatch => "Vector dimensionality does not match the configured value",
            Self::Unauthorized => "Invalid or missing API key",
            Self::InvalidJson => "Request body is not valid JSON for this endpoint",
            Self::InvalidId => "Malformed identifier",
            Self::RouteNotFound => "The requested route does not exist",
            Self::StorageError => "The storage backend failed to process the request",
            Self::StorageTimeout => "The storage backend did not respond in time",
            Self::GatewayError => "The embedding service failed to process the request",
            Self::GatewayTimeout => "The embedding service did not respond in time",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageTimeout
                | Self::GatewayError
                | Self::GatewayTimeout
                | Self::ServiceUnavailable
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
