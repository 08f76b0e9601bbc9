use axum::extract::{FromRequest, Request};
use axum::Json;

use crate::error::NudgeError;

/// A `Json<T>` extractor that rejects with `422` on a schema violation
/// instead of axum's default `400`.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = NudgeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| NudgeError::InvalidPayload(e.to_string()))?;
        Ok(Self(value))
    }
}
