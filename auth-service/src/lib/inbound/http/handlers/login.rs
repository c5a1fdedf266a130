use auth::AuthError;
use axum::extract::FromRequest;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Form;
use axum::Json;
use serde::Deserialize;

use super::issue_login_response;
use super::ApiSuccess;
use super::LoginResponseData;
use crate::inbound::http::middleware::client_address;
use crate::inbound::http::middleware::store_rejection;
use crate::inbound::http::router::AppState;

/// Exchange a username and password for a token.
///
/// Accepts a JSON or urlencoded form body. The token is bound to the
/// caller's address.
pub async fn login(
    State(state): State<AppState>,
    request: Request,
) -> Result<ApiSuccess<LoginResponseData>, Response> {
    let (parts, body) = request.into_parts();
    let address = client_address(&parts.headers, &parts.extensions);
    let request = Request::from_parts(parts, body);

    let credentials = read_credentials(request)
        .await
        .map_err(|e| state.reject(&e))?;

    let user = state
        .settings
        .user_store()
        .validate_credentials(&credentials.username, &credentials.password)
        .await
        .map_err(|e| state.reject(&store_rejection(e, &AuthError::BAD_CREDENTIALS)))?;

    let data = issue_login_response(
        state.settings.authenticator(),
        user.as_ref(),
        address.as_deref(),
    )
    .map_err(|e| state.reject(&e))?;

    Ok(ApiSuccess::new(StatusCode::OK, data))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    username: String,
    password: String,
}

async fn read_credentials(request: Request) -> Result<LoginRequestBody, AuthError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match content_type.as_str() {
        "application/json" => Json::<LoginRequestBody>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .map_err(|e| AuthError::MALFORMED_CONTENT.with_cause(e.body_text())),
        "application/x-www-form-urlencoded" => Form::<LoginRequestBody>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .map_err(|e| AuthError::MALFORMED_CONTENT.with_cause(e.body_text())),
        other => Err(AuthError::UNSUPPORTED_CONTENT_TYPE.with_cause(format!("'{other}'"))),
    }
}
