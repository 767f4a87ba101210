//! Path extractor for prefixed, opaque resource ids such as `vs_...`.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use std::marker::PhantomData;

/// Describes one family of prefixed identifiers.
pub trait IdPrefix {
    /// Leading marker, including the underscore (e.g. `"vs_"`).
    const PREFIX: &'static str;
    /// Resource name used in error messages.
    const RESOURCE: &'static str;
}

/// Extracts a single path parameter and checks its prefix and charset.
///
/// The id body must be non-empty ASCII alphanumerics.
///
/// ```ignore
/// struct StoreId;
/// impl IdPrefix for StoreId {
///     const PREFIX: &'static str = "vs_";
///     const RESOURCE: &'static str = "vector store";
/// }
///
/// async fn get(PrefixedId(id, _): PrefixedId<StoreId>) -> String { id }
/// ```
pub struct PrefixedId<P>(pub String, pub PhantomData<P>);

impl<P> PrefixedId<P> {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<P: IdPrefix> PrefixedId<P> {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let valid = raw
            .strip_prefix(P::PREFIX)
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()));

        if valid {
            Ok(Self(raw.to_string(), PhantomData))
        } else {
            Err(AppError::InvalidId(format!(
                "Invalid {} id '{}': expected '{}' followed by alphanumerics",
                P::RESOURCE,
                raw,
                P::PREFIX
            )))
        }
    }
}

impl<P, S> FromRequestParts<S> for PrefixedId<P>
where
    P: IdPrefix + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::InvalidId(e.body_text()))?;
        Self::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Store;
    impl IdPrefix for Store {
        const PREFIX: &'static str = "vs_";
        const RESOURCE: &'static str = "vector store";
    }

    #[test]
    fn test_accepts_prefixed_hex() {
        let id = PrefixedId::<Store>::parse("vs_0193b4e1c2a07f3e").unwrap();
        assert_eq!(id.into_inner(), "vs_0193b4e1c2a07f3e");
    }

    #[test]
    fn test_rejects_wrong_prefix_or_empty_body() {
        for raw in ["emb_123", "vs_", "123", "vs_12;drop"] {
            assert!(matches!(
                PrefixedId::<Store>::parse(raw),
                Err(AppError::InvalidId(_))
            ));
        }
    }
}
