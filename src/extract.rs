use axum_core::extract::FromRequestParts;
use http::{StatusCode, request::Parts};

use crate::SessionHandle;

/// Axum Extractor for [`SessionHandle`].
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("session layer not found in the request extensions");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "session not found in the request",
                )
            })
    }
}
