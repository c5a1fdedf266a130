//! Authentication primitives shared by HTTP services
//!
//! Provides the framework-agnostic half of request authentication:
//! - Structured, client-safe error taxonomy
//! - Signed session tokens (JWT) with issuer and client-address binding
//! - Token issuance with a configured lifetime
//! - Password hashing (Argon2id) for stores that keep their own records
//!
//! Services own the credential-store traits and the HTTP middleware and
//! build them on top of these types.
//!
//! # Examples
//!
//! ## Issue and verify a token
//! ```
//! use auth::{Authenticator, ClaimMap, Subject, TokenCodec};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!", "auth.example.com");
//! let auth = Authenticator::new(codec, Duration::hours(24));
//!
//! let subject = Subject { id: "user123", name: "alice", domain: None };
//! let issued = auth.issue(subject, Some("10.0.0.7"), &ClaimMap::new()).unwrap();
//!
//! let token = auth.validate_token(&issued.access_token, Some("10.0.0.7"), false).unwrap();
//! assert_eq!(token.user_id, "user123");
//! ```
//!
//! ## Errors
//! ```
//! use auth::AuthError;
//!
//! let err = AuthError::BAD_CREDENTIALS.with_cause("directory said no");
//! assert_eq!(err.id(), "BadCredentials");
//! assert_eq!(err.status(), 401);
//! assert!(AuthError::BAD_CREDENTIALS.cause().is_none());
//! ```

pub mod authenticator;
pub mod errors;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::Authenticator;
pub use authenticator::IssuedToken;
pub use authenticator::Subject;
pub use errors::AuthError;
pub use errors::ErrorBody;
pub use errors::ErrorKind;
pub use jwt::ClaimMap;
pub use jwt::Token;
pub use jwt::TokenCodec;
pub use password::PasswordError;
