use auth::AuthError;
use auth::Authenticator;
use auth::Subject;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::user::ports::User;

pub mod check_token;
pub mod current_user;
pub mod login;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

/// Token handed out by the login, check and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub token: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expired_at: DateTime<Utc>,
}

/// Issue a fresh token for `user`, bound to `client_address` when known.
pub(crate) fn issue_login_response(
    authenticator: &Authenticator,
    user: &dyn User,
    client_address: Option<&str>,
) -> Result<LoginResponseData, AuthError> {
    let subject = Subject {
        id: user.id(),
        name: user.name(),
        domain: user.domain(),
    };
    let issued = authenticator.issue(subject, client_address, user.claims())?;

    tracing::info!(
        user_id = user.id(),
        client_address = client_address.unwrap_or_default(),
        expires_at = %issued.token.expires_at,
        "Token issued"
    );

    Ok(LoginResponseData {
        token: issued.access_token,
        user_id: issued.token.user_id,
        user_name: issued.token.user_name,
        expired_at: issued.token.expires_at,
    })
}
