use thiserror::Error;

/// Failure reported by a credential store.
///
/// The text may contain backend details; it is only ever logged or attached
/// as a cause, never used as the client-facing message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Credential directory pool is closed")]
    PoolClosed,

    #[error("Credential directory unavailable: {0}")]
    Unavailable(String),

    #[error("Credential store error: {0}")]
    Backend(String),
}
