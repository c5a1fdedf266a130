use std::ops::Deref;

use auth::AuthError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use super::errors::ErrorRenderer;
use crate::user::ports::SharedUser;

/// Identity attached to a request by the authentication middleware.
///
/// Inserted once per request and only read afterwards. As an extractor it
/// rejects requests that did not pass through the middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SharedUser);

impl Deref for CurrentUser {
    type Target = SharedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            tracing::error!(uri = %parts.uri, "Route expects an authenticated user but no middleware ran");
            ErrorRenderer::default().render(&AuthError::BAD_AUTHORIZATION_HEADER)
        })
    }
}
