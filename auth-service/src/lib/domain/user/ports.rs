use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use auth::ClaimMap;

use crate::user::errors::StoreError;

/// Authenticated identity as seen by the middleware and handlers.
pub trait User: fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn email(&self) -> &str;

    fn is_admin(&self) -> bool;

    /// Custom claims copied into tokens issued for this user.
    fn claims(&self) -> &ClaimMap;

    /// Tenant or directory domain, if the store has one.
    fn domain(&self) -> Option<&str> {
        None
    }
}

/// Shared, immutable handle to a resolved user.
pub type SharedUser = Arc<dyn User>;

/// Credential store capability consumed by the authentication middleware.
///
/// Implementations own their backend resources. Dropping an in-flight call
/// cancels it; the middleware does no extra bookkeeping.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Check a username/password pair.
    ///
    /// # Arguments
    /// * `username` - Login name as presented by the client
    /// * `password` - Plaintext password, may contain `:`
    ///
    /// # Returns
    /// The matching user
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown user or wrong password
    /// * `PoolClosed` - Store has been shut down
    /// * `Unavailable` / `Backend` - Backend failure
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SharedUser, StoreError>;

    /// Resolve a user by the id carried in a token.
    ///
    /// # Errors
    /// * `NotFound` - No user with this id
    /// * `PoolClosed` - Store has been shut down
    /// * `Unavailable` / `Backend` - Backend failure
    async fn find_user_by_id(&self, user_id: &str) -> Result<SharedUser, StoreError>;

    /// Release backend resources. Further calls may fail.
    async fn close(&self);
}
