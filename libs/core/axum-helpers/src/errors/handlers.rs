use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use super::{ErrorCode, ErrorResponse};

/// Fallback handler for unmatched routes.
pub async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "No route matched");
    let code = ErrorCode::RouteNotFound;
    let body = ErrorResponse::new(
        code,
        format!("{}: {}", code.default_message(), uri.path()),
        None,
    );

    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
