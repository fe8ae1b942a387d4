//! Extractors that deserialize and validate request input in one step.
//!
//! Both reject with [`Error`], so malformed JSON, a wrong field type and a
//! failed [`Validate`] check all produce the same `BAD_REQUEST` envelope.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::types::Validate;
use crate::error::Error;

/// Validated JSON body.
pub struct Valid<T: Validate>(pub T::Output);

#[async_trait]
impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<T>::from_request(req, state).await?;
        Ok(Valid(raw.validate()?))
    }
}

/// Validated query string.
pub struct ValidQuery<T: Validate>(pub T::Output);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ValidQuery(raw.validate()?))
    }
}
