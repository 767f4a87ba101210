pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// OpenAI-compatible error envelope.
///
/// ```json
/// {
///   "error": {
///     "message": "Vector store vs_123 not found",
///     "type": "invalid_request_error",
///     "param": null,
///     "code": "not_found",
///     "retryable": false
///   }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message, safe to show to API users
    pub message: String,
    /// Error category (`invalid_request_error`, `authentication_error`, `api_error`, `server_error`)
    #[serde(rename = "type")]
    pub error_type: String,
    /// Request field the error refers to, when known
    pub param: Option<String>,
    /// Machine-readable code
    pub code: ErrorCode,
    /// Whether the same request may succeed if retried later
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>, param: Option<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
                error_type: code.error_type().to_string(),
                param,
                code,
                retryable: code.is_retryable(),
            },
        }
    }
}

/// Application error type that can be converted to HTTP responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Bad Request: {message}")]
    BadRequest {
        message: String,
        param: Option<String>,
    },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage timeout: {0}")]
    StorageTimeout(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            param: None,
        }
    }

    pub fn bad_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            param: Some(param.into()),
        }
    }

    /// Status code and error code this error renders as.
    pub fn classify(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::JsonExtractorRejection(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidJson),
            AppError::ValidationError(_) | AppError::BadRequest { .. } => {
                (StatusCode::BAD_REQUEST, ErrorCode::ValidationError)
            }
            AppError::DimensionMismatch(_) => (StatusCode::BAD_REQUEST, ErrorCode::DimensionMismatch),
            AppError::InvalidId(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidId),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Database(e) => classify_db_error(e),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StorageError),
            AppError::StorageTimeout(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::StorageTimeout)
            }
            AppError::Gateway(_) => (StatusCode::BAD_GATEWAY, ErrorCode::GatewayError),
            AppError::GatewayTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, ErrorCode::GatewayTimeout),
            AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
            }
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let error_code = code.code();

        let (message, param) = match self {
            AppError::JsonExtractorRejection(e) => {
                tracing::info!(error_code, "JSON extraction error: {:?}", e);
                (e.body_text(), None)
            }
            AppError::ValidationError(e) => {
                tracing::info!(error_code, "Validation error: {:?}", e);
                summarize_validation(&e)
            }
            AppError::BadRequest { message, param } => {
                tracing::info!(error_code, "Bad request: {}", message);
                (message, param)
            }
            AppError::DimensionMismatch(msg) => {
                tracing::info!(error_code, "Dimension mismatch: {}", msg);
                (msg, None)
            }
            AppError::InvalidId(msg) => {
                tracing::info!(error_code, "Invalid identifier: {}", msg);
                (msg, None)
            }
            AppError::Unauthorized(msg) => {
                tracing::info!(error_code, "Unauthorized: {}", msg);
                (code.default_message().to_string(), None)
            }
            AppError::NotFound(msg) => {
                tracing::info!(error_code, "Not found: {}", msg);
                (msg, None)
            }
            // Storage details stay in the logs: they name tables and columns.
            AppError::Database(e) => {
                tracing::error!(error_code, "Database error: {:?}", e);
                (code.default_message().to_string(), None)
            }
            AppError::Storage(msg) => {
                tracing::error!(error_code, "Storage error: {}", msg);
                (code.default_message().to_string(), None)
            }
            AppError::StorageTimeout(msg) => {
                tracing::warn!(error_code, "Storage timeout: {}", msg);
                (code.default_message().to_string(), None)
            }
            AppError::Gateway(msg) => {
                tracing::warn!(error_code, "Gateway error: {}", msg);
                (format!("{}: {}", code.default_message(), msg), None)
            }
            AppError::GatewayTimeout(msg) => {
                tracing::warn!(error_code, "Gateway timeout: {}", msg);
                (code.default_message().to_string(), None)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(error_code, "Internal server error: {}", msg);
                (code.default_message().to_string(), None)
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!(error_code, "Service unavailable: {}", msg);
                (msg, None)
            }
        };

        (status, Json(ErrorResponse::new(code, message, param))).into_response()
    }
}

fn classify_db_error(error: &DbErr) -> (StatusCode, ErrorCode) {
    match error {
        DbErr::ConnectionAcquire(_) => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::StorageTimeout),
        DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StorageError),
    }
}

/// Flattens validator output into one message; `param` is the first failing field.
fn summarize_validation(errors: &ValidationErrors) -> (String, Option<String>) {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let param = fields.first().map(|(field, _)| field.to_string());
    let parts: Vec<String> = fields
        .iter()
        .map(|(field, errs)| {
            let reasons: Vec<String> = errs
                .iter()
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string())
                })
                .collect();
            format!("{}: {}", field, reasons.join(", "))
        })
        .collect();

    let message = if parts.is_empty() {
        ErrorCode::ValidationError.default_message().to_string()
    } else {
        parts.join("; ")
    };
    (message, param)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use validator::Validate;

    async fn render(error: AppError) -> (StatusCode, ErrorResponse) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = render(AppError::NotFound("Vector store vs_1 not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, ErrorCode::NotFound);
        assert_eq!(body.error.error_type, "invalid_request_error");
        assert_eq!(body.error.message, "Vector store vs_1 not found");
        assert!(!body.error.retryable);
    }

    #[tokio::test]
    async fn test_storage_error_hides_details() {
        let (status, body) =
            render(AppError::Storage("column \"embedding\" does not exist".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.message.contains("embedding"));
        assert_eq!(body.error.error_type, "server_error");
    }

    #[tokio::test]
    async fn test_db_error_hides_details() {
        let (status, body) =
            render(AppError::Database(DbErr::Custom("relation \"emb\" missing".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, ErrorCode::StorageError);
        assert!(!body.error.message.contains("emb\""));
    }

    #[tokio::test]
    async fn test_timeouts_are_marked_retryable() {
        let (status, body) = render(AppError::GatewayTimeout("30s".into())).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body.error.retryable);

        let (status, body) = render(AppError::StorageTimeout("30s".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.error.retryable);
    }

    #[tokio::test]
    async fn test_unauthorized_uses_fixed_message() {
        let (status, body) = render(AppError::Unauthorized("token mismatch".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error.error_type, "authentication_error");
        assert_eq!(body.error.message, ErrorCode::Unauthorized.default_message());
    }

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
    }

    #[tokio::test]
    async fn test_validation_errors_name_the_field() {
        let errors = Named {
            name: String::new(),
        }
        .validate()
        .unwrap_err();
        let (status, body) = render(AppError::ValidationError(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.param.as_deref(), Some("name"));
        assert_eq!(body.error.message, "name: must not be empty");
    }
}
