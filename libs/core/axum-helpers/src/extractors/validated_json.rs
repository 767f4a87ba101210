//! JSON extractor with automatic validation using the validator crate.

use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body extractor that also runs `Validate`.
///
/// Parse failures and validation failures both render as the standard
/// error envelope with status 400.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateVectorStore {
///     #[validate(length(min = 1, max = 256))]
///     name: String,
/// }
///
/// async fn create(ValidatedJson(body): ValidatedJson<CreateVectorStore>) { /* ... */ }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}
