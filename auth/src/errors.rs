use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Stable classification of an authentication failure.
///
/// The `Display` text of each kind is the client-safe message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("Authorization header is missing or malformed")]
    BadAuthorizationHeader,

    #[error("Unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("The token is not valid")]
    InvalidToken,

    #[error("Token has no user_id claim")]
    MissingUserId,

    #[error("Token has no exp claim")]
    MissingExpiration,

    #[error("Token was issued by another issuer")]
    InvalidIssuer,

    #[error("Token was issued to another client address")]
    InvalidClientAddress,

    #[error("Invalid credentials")]
    BadCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Administrator privileges required")]
    NotAdmin,

    #[error("Failed to encode token")]
    EncodeFailed,

    #[error("Credential directory pool is closed")]
    PoolClosed,

    #[error("Unsupported content type")]
    UnsupportedContentType,

    #[error("Malformed request body")]
    MalformedContent,
}

impl ErrorKind {
    /// Machine-readable identifier rendered as `id`.
    pub const fn id(self) -> &'static str {
        match self {
            Self::BadAuthorizationHeader => "BadAuthorizationHeader",
            Self::UnsupportedScheme => "UnsupportedScheme",
            Self::InvalidToken => "InvalidToken",
            Self::MissingUserId => "MissingUserID",
            Self::MissingExpiration => "MissingExpiration",
            Self::InvalidIssuer => "InvalidIssuer",
            Self::InvalidClientAddress => "InvalidClientAddress",
            Self::BadCredentials => "BadCredentials",
            Self::UserNotFound => "UserNotFound",
            Self::NotAdmin => "NotAdmin",
            Self::EncodeFailed => "EncodeFailed",
            Self::PoolClosed => "PoolClosed",
            Self::UnsupportedContentType => "UnsupportedContentType",
            Self::MalformedContent => "MalformedContent",
        }
    }

    /// HTTP status code associated with the kind.
    pub const fn status(self) -> u16 {
        match self {
            Self::NotAdmin => 403,
            Self::PoolClosed => 503,
            Self::UnsupportedContentType => 415,
            Self::MalformedContent => 400,
            _ => 401,
        }
    }

    /// True for failures caused by the server or its environment rather
    /// than by the request.
    pub const fn is_server_fault(self) -> bool {
        matches!(self, Self::EncodeFailed | Self::PoolClosed)
    }
}

/// Structured, client-safe authentication error.
///
/// Values are immutable. The associated constants are shared sentinels;
/// attach a per-request cause with [`AuthError::with_cause`], which returns
/// a new value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct AuthError {
    kind: ErrorKind,
    cause: Option<String>,
}

impl AuthError {
    pub const BAD_AUTHORIZATION_HEADER: AuthError = AuthError::new(ErrorKind::BadAuthorizationHeader);
    pub const UNSUPPORTED_SCHEME: AuthError = AuthError::new(ErrorKind::UnsupportedScheme);
    pub const INVALID_TOKEN: AuthError = AuthError::new(ErrorKind::InvalidToken);
    pub const MISSING_USER_ID: AuthError = AuthError::new(ErrorKind::MissingUserId);
    pub const MISSING_EXPIRATION: AuthError = AuthError::new(ErrorKind::MissingExpiration);
    pub const INVALID_ISSUER: AuthError = AuthError::new(ErrorKind::InvalidIssuer);
    pub const INVALID_CLIENT_ADDRESS: AuthError = AuthError::new(ErrorKind::InvalidClientAddress);
    pub const BAD_CREDENTIALS: AuthError = AuthError::new(ErrorKind::BadCredentials);
    pub const USER_NOT_FOUND: AuthError = AuthError::new(ErrorKind::UserNotFound);
    pub const NOT_ADMIN: AuthError = AuthError::new(ErrorKind::NotAdmin);
    pub const ENCODE_FAILED: AuthError = AuthError::new(ErrorKind::EncodeFailed);
    pub const POOL_CLOSED: AuthError = AuthError::new(ErrorKind::PoolClosed);
    pub const UNSUPPORTED_CONTENT_TYPE: AuthError = AuthError::new(ErrorKind::UnsupportedContentType);
    pub const MALFORMED_CONTENT: AuthError = AuthError::new(ErrorKind::MalformedContent);

    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, cause: None }
    }

    /// Copy of this error carrying `cause`. The receiver is left untouched.
    pub fn with_cause(&self, cause: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            cause: Some(cause.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Wire representation of the error.
    ///
    /// The cause is only carried when `include_cause` is set, so store or
    /// directory details do not reach clients by default.
    pub fn body(&self, include_cause: bool) -> ErrorBody<'_> {
        ErrorBody {
            id: self.id(),
            status: self.status(),
            message: self.message(),
            cause: if include_cause { self.cause() } else { None },
        }
    }
}

impl From<ErrorKind> for AuthError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// JSON body rendered for a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody<'a> {
    pub id: &'static str,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_cause_leaves_sentinel_untouched() {
        let sentinel = AuthError::BAD_CREDENTIALS;
        let wrapped = sentinel.with_cause("ldap bind refused");

        assert_eq!(sentinel.cause(), None);
        assert_eq!(wrapped.cause(), Some("ldap bind refused"));
        assert_eq!(wrapped.kind(), ErrorKind::BadCredentials);
        assert_eq!(AuthError::BAD_CREDENTIALS, sentinel);
    }

    #[test]
    fn test_display_hides_cause() {
        let err = AuthError::USER_NOT_FOUND.with_cause("no such entry in ou=people");
        assert_eq!(err.to_string(), "User not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::BAD_AUTHORIZATION_HEADER.status(), 401);
        assert_eq!(AuthError::ENCODE_FAILED.status(), 401);
        assert_eq!(AuthError::NOT_ADMIN.status(), 403);
        assert_eq!(AuthError::POOL_CLOSED.status(), 503);
        assert_eq!(AuthError::UNSUPPORTED_CONTENT_TYPE.status(), 415);
        assert_eq!(AuthError::MALFORMED_CONTENT.status(), 400);
    }

    #[test]
    fn test_server_faults() {
        assert!(ErrorKind::EncodeFailed.is_server_fault());
        assert!(ErrorKind::PoolClosed.is_server_fault());
        assert!(!ErrorKind::InvalidToken.is_server_fault());
    }

    #[test]
    fn test_body_serialization() {
        let err = AuthError::INVALID_TOKEN.with_cause("signature mismatch");

        let hidden = serde_json::to_value(err.body(false)).unwrap();
        assert_eq!(
            hidden,
            serde_json::json!({
                "id": "InvalidToken",
                "status": 401,
                "message": "The token is not valid"
            })
        );

        let exposed = serde_json::to_value(err.body(true)).unwrap();
        assert_eq!(exposed["cause"], "signature mismatch");
    }

    #[test]
    fn test_missing_user_id_identifier() {
        assert_eq!(AuthError::MISSING_USER_ID.id(), "MissingUserID");
    }
}
