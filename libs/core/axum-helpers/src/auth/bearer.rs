use super::AuthConfig;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Verifier for the static API key.
///
/// Only the SHA-256 digest of the key is kept in memory; presented tokens are
/// hashed and compared in constant time.
#[derive(Clone)]
pub struct BearerAuth {
    expected: Arc<[u8; 32]>,
}

impl BearerAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            expected: Arc::new(digest(&config.api_key)),
        }
    }

    pub fn verify(&self, token: &str) -> bool {
        let presented = digest(token);
        presented
            .iter()
            .zip(self.expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Pulls the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects requests without a valid bearer token.
///
/// ```ignore
/// let protected = Router::new()
///     .route("/vector_stores", post(create))
///     .route_layer(axum::middleware::from_fn_with_state(
///         BearerAuth::new(&auth_config),
///         bearer_auth_middleware,
///     ));
/// ```
pub async fn bearer_auth_middleware(
    State(auth): State<BearerAuth>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Err(AppError::Unauthorized(
            "missing bearer token".to_string(),
        ));
    };

    if !auth.verify(token) {
        return Err(AppError::Unauthorized("bearer token mismatch".to_string()));
    }

    Ok(next.run(request).await)
}
