use auth::AuthError;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Response;

use super::issue_login_response;
use super::ApiSuccess;
use super::LoginResponseData;
use crate::inbound::http::middleware::client_address;
use crate::inbound::http::middleware::parse_authorization;
use crate::inbound::http::middleware::store_rejection;
use crate::inbound::http::middleware::SCHEME_BEARER;
use crate::inbound::http::router::AppState;

/// Verify the presented Bearer token and answer with a freshly issued one.
pub async fn check_token(
    State(state): State<AppState>,
    request: Request,
) -> Result<ApiSuccess<LoginResponseData>, Response> {
    let (parts, _body) = request.into_parts();

    reissue(&state, &parts, false)
        .await
        .map(|data| ApiSuccess::new(StatusCode::OK, data))
        .map_err(|e| state.reject(&e))
}

/// Like [`check_token`], but an expired token is still accepted.
pub async fn refresh_token(
    State(state): State<AppState>,
    request: Request,
) -> Result<ApiSuccess<LoginResponseData>, Response> {
    let (parts, _body) = request.into_parts();

    reissue(&state, &parts, true)
        .await
        .map(|data| ApiSuccess::new(StatusCode::OK, data))
        .map_err(|e| state.reject(&e))
}

async fn reissue(
    state: &AppState,
    parts: &Parts,
    allow_expired: bool,
) -> Result<LoginResponseData, AuthError> {
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::BAD_AUTHORIZATION_HEADER)?
        .to_str()
        .map_err(|e| AuthError::BAD_AUTHORIZATION_HEADER.with_cause(e))?;

    let (scheme, access_token) = parse_authorization(authorization)?;
    if scheme != SCHEME_BEARER {
        return Err(AuthError::UNSUPPORTED_SCHEME.with_cause(scheme));
    }

    let address = client_address(&parts.headers, &parts.extensions);
    let authenticator = state.settings.authenticator();
    let token = authenticator.validate_token(&access_token, address.as_deref(), allow_expired)?;

    let user = state
        .settings
        .user_store()
        .find_user_by_id(&token.user_id)
        .await
        .map_err(|e| store_rejection(e, &AuthError::USER_NOT_FOUND))?;

    issue_login_response(authenticator, user.as_ref(), address.as_deref())
}
