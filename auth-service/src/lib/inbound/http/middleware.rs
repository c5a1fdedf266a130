use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthError;
use auth::Authenticator;
use axum::extract::ConnectInfo;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::Extensions;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::context::CurrentUser;
use super::errors::ErrorHandler;
use super::errors::ErrorRenderer;
use crate::user::errors::StoreError;
use crate::user::ports::SharedUser;
use crate::user::ports::UserStore;

pub const SCHEME_BASIC: &str = "basic";
pub const SCHEME_BEARER: &str = "bearer";

pub const DEFAULT_TOKEN_QUERY_KEY: &str = "auth_token";
pub const DEFAULT_TOKEN_COOKIE: &str = "token";

/// Validator for `Authorization` schemes other than Basic and Bearer.
///
/// Its result is used as-is: an `Ok` identity still goes through the admin
/// gate, an `Err` is rendered to the client.
#[async_trait]
pub trait SchemeValidator: Send + Sync + 'static {
    async fn validate(
        &self,
        parts: &Parts,
        scheme: &str,
        credential: &str,
    ) -> Result<SharedUser, AuthError>;
}

/// Collaborators and options shared by every guard of a service.
pub struct AuthSettings {
    authenticator: Arc<Authenticator>,
    user_store: Arc<dyn UserStore>,
    scheme_validator: Option<Arc<dyn SchemeValidator>>,
    error_handler: ErrorHandler,
    token_query_key: String,
    token_cookie: String,
}

impl AuthSettings {
    pub fn new(authenticator: Arc<Authenticator>, user_store: Arc<dyn UserStore>) -> Self {
        Self {
            authenticator,
            user_store,
            scheme_validator: None,
            error_handler: ErrorRenderer::default().handler(),
            token_query_key: DEFAULT_TOKEN_QUERY_KEY.to_string(),
            token_cookie: DEFAULT_TOKEN_COOKIE.to_string(),
        }
    }

    pub fn with_scheme_validator(mut self, validator: Arc<dyn SchemeValidator>) -> Self {
        self.scheme_validator = Some(validator);
        self
    }

    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn with_token_query_key(mut self, key: impl Into<String>) -> Self {
        self.token_query_key = key.into();
        self
    }

    pub fn with_token_cookie(mut self, name: impl Into<String>) -> Self {
        self.token_cookie = name.into();
        self
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn user_store(&self) -> &dyn UserStore {
        self.user_store.as_ref()
    }

    pub fn render(&self, err: &AuthError) -> Response {
        (self.error_handler)(err)
    }
}

/// Middleware state: the shared settings plus this route group's gate.
#[derive(Clone)]
pub struct AuthGuard {
    settings: Arc<AuthSettings>,
    require_admin: bool,
}

impl AuthGuard {
    /// Any authenticated user passes.
    pub fn require_user(settings: Arc<AuthSettings>) -> Self {
        Self {
            settings,
            require_admin: false,
        }
    }

    /// Only users reporting admin privilege pass.
    pub fn require_admin(settings: Arc<AuthSettings>) -> Self {
        Self {
            settings,
            require_admin: true,
        }
    }

    async fn resolve(&self, parts: &Parts) -> Result<SharedUser, AuthError> {
        match presented_credential(parts, &self.settings)? {
            Credential::Header { scheme, value } => match scheme.as_str() {
                SCHEME_BASIC => self.basic(&value).await,
                SCHEME_BEARER => self.bearer(parts, &value).await,
                _ => match &self.settings.scheme_validator {
                    Some(validator) => validator.validate(parts, &scheme, &value).await,
                    None => Err(AuthError::UNSUPPORTED_SCHEME.with_cause(&scheme)),
                },
            },
            Credential::Token(token) => self.bearer(parts, &token).await,
        }
    }

    async fn basic(&self, payload: &str) -> Result<SharedUser, AuthError> {
        let (username, password) = decode_basic(payload)?;

        self.settings
            .user_store
            .validate_credentials(&username, &password)
            .await
            .map_err(|e| store_rejection(e, &AuthError::BAD_CREDENTIALS))
    }

    async fn bearer(&self, parts: &Parts, access_token: &str) -> Result<SharedUser, AuthError> {
        let address = client_address(&parts.headers, &parts.extensions);
        let token =
            self.settings
                .authenticator
                .validate_token(access_token, address.as_deref(), false)?;

        self.settings
            .user_store
            .find_user_by_id(&token.user_id)
            .await
            .map_err(|e| store_rejection(e, &AuthError::USER_NOT_FOUND))
    }

    fn authorize(&self, user: SharedUser) -> Result<SharedUser, AuthError> {
        if self.require_admin && !user.is_admin() {
            return Err(AuthError::NOT_ADMIN.with_cause(format!("user {}", user.id())));
        }
        Ok(user)
    }
}

/// Authentication middleware, installed with
/// `axum::middleware::from_fn_with_state(guard, authenticate)`.
///
/// On success the request continues with a [`CurrentUser`] extension. An
/// identity attached by an outer guard is reused; only the admin gate runs
/// again. On failure the configured error handler renders the response and
/// the inner service is not called.
pub async fn authenticate(State(guard): State<AuthGuard>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let attached = parts.extensions.get::<CurrentUser>().cloned();
    let result = match attached {
        Some(CurrentUser(user)) => Ok(user),
        None => guard.resolve(&parts).await,
    }
    .and_then(|user| guard.authorize(user));

    match result {
        Ok(user) => {
            tracing::debug!(user_id = user.id(), uri = %parts.uri, "Request authenticated");
            parts.extensions.insert(CurrentUser(user));
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => {
            tracing::warn!(
                id = err.id(),
                cause = err.cause().unwrap_or_default(),
                method = %parts.method,
                uri = %parts.uri,
                "Request rejected"
            );
            guard.settings.render(&err)
        }
    }
}

enum Credential {
    Header { scheme: String, value: String },
    Token(String),
}

fn presented_credential(parts: &Parts, settings: &AuthSettings) -> Result<Credential, AuthError> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|e| AuthError::BAD_AUTHORIZATION_HEADER.with_cause(e))?;
        if !value.trim().is_empty() {
            let (scheme, value) = parse_authorization(value)?;
            return Ok(Credential::Header { scheme, value });
        }
    }

    if parts.method == Method::GET {
        if let Some(token) = query_token(parts, &settings.token_query_key) {
            return Ok(Credential::Token(token));
        }
        if let Some(token) = cookie_token(&parts.headers, &settings.token_cookie) {
            return Ok(Credential::Token(token));
        }
    }

    Err(AuthError::BAD_AUTHORIZATION_HEADER)
}

fn query_token(parts: &Parts, key: &str) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
    params.remove(key).filter(|token| !token.is_empty())
}

fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Split an `Authorization` value into a lowercased scheme and its credential.
///
/// # Errors
/// * `BadAuthorizationHeader` - Value is not exactly two whitespace-separated fields
pub fn parse_authorization(value: &str) -> Result<(String, String), AuthError> {
    let mut fields = value.split_whitespace();

    match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(credential), None) => {
            Ok((scheme.to_ascii_lowercase(), credential.to_string()))
        }
        _ => Err(AuthError::BAD_AUTHORIZATION_HEADER),
    }
}

/// Decode a Basic payload into username and password, splitting on the
/// first colon.
///
/// # Errors
/// * `BadAuthorizationHeader` - Payload is not base64 UTF-8 or has no colon
pub fn decode_basic(payload: &str) -> Result<(String, String), AuthError> {
    let decoded = STANDARD
        .decode(payload)
        .map_err(|e| AuthError::BAD_AUTHORIZATION_HEADER.with_cause(e))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| AuthError::BAD_AUTHORIZATION_HEADER.with_cause(e))?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::BAD_AUTHORIZATION_HEADER.with_cause("missing ':' in basic credentials"))?;

    Ok((username.to_string(), password.to_string()))
}

/// Address of the requesting client.
///
/// Prefers the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// socket peer recorded by `into_make_service_with_connect_info`.
pub fn client_address(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|address| !address.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|address| !address.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(peer)| peer.ip().to_string())
        })
}

/// Map a store failure onto the error the client sees.
///
/// A closed pool is a server fault and keeps its own kind; anything else
/// becomes `fallback` with the store error attached as cause.
pub fn store_rejection(err: StoreError, fallback: &AuthError) -> AuthError {
    match err {
        StoreError::PoolClosed => AuthError::POOL_CLOSED.with_cause(err),
        _ => fallback.with_cause(err),
    }
}
