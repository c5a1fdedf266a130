use std::sync::Arc;
use std::time::Duration;

use auth::AuthError;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::check_token::check_token;
use super::handlers::check_token::refresh_token;
use super::handlers::current_user::current_user;
use super::handlers::login::login;
use super::middleware::authenticate;
use super::middleware::AuthGuard;
use super::middleware::AuthSettings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AuthSettings>,
}

impl AppState {
    /// Log and render a rejection the same way the middleware does.
    pub fn reject(&self, err: &AuthError) -> axum::response::Response {
        tracing::warn!(
            id = err.id(),
            cause = err.cause().unwrap_or_default(),
            "Request rejected"
        );
        self.settings.render(err)
    }
}

pub fn create_router(settings: Arc<AuthSettings>) -> Router {
    let state = AppState {
        settings: Arc::clone(&settings),
    };

    let public_routes = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/token", get(check_token))
        .route("/api/auth/refresh", post(refresh_token));

    let user_routes = Router::new()
        .route("/api/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(
            AuthGuard::require_user(Arc::clone(&settings)),
            authenticate,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(
            AuthGuard::require_admin(settings),
            authenticate,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
