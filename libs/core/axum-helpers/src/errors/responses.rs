//! Reusable OpenAPI response types for consistent API documentation.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Bad Request - validation failed",
    content_type = "application/json",
    example = json!({
        "error": {
            "message": "name: must not be empty",
            "type": "invalid_request_error",
            "param": "name",
            "code": "validation_error",
            "retryable": false
        }
    })
)]
pub struct BadRequestResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Unauthorized - missing or invalid bearer token",
    content_type = "application/json",
    example = json!({
        "error": {
            "message": "Invalid or missing API key",
            "type": "authentication_error",
            "param": null,
            "code": "unauthorized",
            "retryable": false
        }
    })
)]
pub struct UnauthorizedResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "error": {
            "message": "Vector store vs_0193b4e1c2a07f3e9d5b8a6c4e2f1a0b not found",
            "type": "invalid_request_error",
            "param": null,
            "code": "not_found",
            "retryable": false
        }
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Embedding gateway failed or timed out",
    content_type = "application/json",
    example = json!({
        "error": {
            "message": "The embedding service did not respond in time",
            "type": "api_error",
            "param": null,
            "code": "gateway_timeout",
            "retryable": true
        }
    })
)]
pub struct GatewayErrorResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "error": {
            "message": "The storage backend failed to process the request",
            "type": "server_error",
            "param": null,
            "code": "storage_error",
            "retryable": false
        }
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);
