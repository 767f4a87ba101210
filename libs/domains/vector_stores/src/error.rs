use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("Invalid input: {message}")]
    Validation {
        message: String,
        param: Option<String>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("Vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding gateway error: {0}")]
    Gateway(String),

    #[error("Embedding gateway timed out: {0}")]
    GatewayTimeout(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage timed out: {0}")]
    StorageTimeout(String),
}

pub type VectorStoreResult<T> = Result<T, VectorStoreError>;

impl VectorStoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            param: None,
        }
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            param: Some(param.into()),
        }
    }

    pub fn store_not_found(id: &str) -> Self {
        Self::NotFound(format!("Vector store {} not found", id))
    }

    /// Fails with `DimensionMismatch` unless `actual == expected`.
    pub fn check_dimensions(expected: usize, actual: usize) -> VectorStoreResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::DimensionMismatch { expected, actual })
        }
    }

    /// Timeouts and gateway failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway(_) | Self::GatewayTimeout(_) | Self::StorageTimeout(_)
        )
    }
}

impl From<DbErr> for VectorStoreError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(e) => Self::StorageTimeout(e.to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for VectorStoreError {
    fn from(errors: ValidationErrors) -> Self {
        let param = errors.errors().keys().min().map(|field| field.to_string());
        Self::Validation {
            message: errors.to_string(),
            param,
        }
    }
}

/// Convert VectorStoreError to AppError for standardized error responses
impl From<VectorStoreError> for AppError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::Validation { message, param } => {
                AppError::BadRequest { message, param }
            }
            VectorStoreError::NotFound(msg) => AppError::NotFound(msg),
            e @ VectorStoreError::DimensionMismatch { .. } => {
                AppError::DimensionMismatch(e.to_string())
            }
            VectorStoreError::Gateway(msg) => AppError::Gateway(msg),
            VectorStoreError::GatewayTimeout(msg) => AppError::GatewayTimeout(msg),
            VectorStoreError::Storage(msg) => AppError::Storage(msg),
            VectorStoreError::StorageTimeout(msg) => AppError::StorageTimeout(msg),
        }
    }
}

impl IntoResponse for VectorStoreError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_helpers::ErrorCode;

    #[test]
    fn test_dimension_mismatch_is_its_own_code() {
        let app: AppError = VectorStoreError::DimensionMismatch {
            expected: 1536,
            actual: 3,
        }
        .into();
        assert_eq!(
            app.classify(),
            (StatusCode::BAD_REQUEST, ErrorCode::DimensionMismatch)
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (VectorStoreError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                VectorStoreError::store_not_found("vs_1"),
                StatusCode::NOT_FOUND,
            ),
            (
                VectorStoreError::Gateway("503".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                VectorStoreError::GatewayTimeout("30s".into()),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                VectorStoreError::Storage("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                VectorStoreError::StorageTimeout("30s".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).classify().0, status);
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(VectorStoreError::GatewayTimeout("x".into()).is_retryable());
        assert!(VectorStoreError::StorageTimeout("x".into()).is_retryable());
        assert!(!VectorStoreError::validation("x").is_retryable());
        assert!(
            !VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_check_dimensions() {
        assert!(VectorStoreError::check_dimensions(3, 3).is_ok());
        assert!(matches!(
            VectorStoreError::check_dimensions(3, 4),
            Err(VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 4
            })
        ));
    }
}
