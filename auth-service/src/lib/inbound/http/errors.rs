use std::sync::Arc;

use auth::AuthError;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

/// Body format used for rejected requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFormat {
    #[default]
    Json,
    Text,
}

/// Renders an [`AuthError`] into an HTTP response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorRenderer {
    pub format: ErrorFormat,
    pub expose_cause: bool,
}

/// Pluggable rejection renderer installed on the middleware.
pub type ErrorHandler = Arc<dyn Fn(&AuthError) -> Response + Send + Sync>;

impl ErrorRenderer {
    pub fn new(format: ErrorFormat, expose_cause: bool) -> Self {
        Self {
            format,
            expose_cause,
        }
    }

    pub fn render(&self, err: &AuthError) -> Response {
        if err.kind().is_server_fault() {
            tracing::error!(id = err.id(), cause = ?err.cause(), "Authentication server fault");
        }

        let status =
            StatusCode::from_u16(err.status()).unwrap_or(StatusCode::UNAUTHORIZED);

        match self.format {
            ErrorFormat::Json => (status, Json(err.body(self.expose_cause))).into_response(),
            ErrorFormat::Text => {
                let mut text = format!("Reason: {}", err.message());
                if let (true, Some(cause)) = (self.expose_cause, err.cause()) {
                    text.push_str(": ");
                    text.push_str(cause);
                }
                (
                    status,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    text,
                )
                    .into_response()
            }
        }
    }

    pub fn handler(self) -> ErrorHandler {
        Arc::new(move |err: &AuthError| self.render(err))
    }
}
