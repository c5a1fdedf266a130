use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::client::LdapDialer;
use super::config::LdapConfig;
use super::pool::Connection;
use super::pool::ConnectionPool;
use super::pool::Dialer;
use crate::user::errors::StoreError;
use crate::user::models::StdUser;
use crate::user::ports::SharedUser;
use crate::user::ports::UserStore;

/// Entry returned by a directory lookup, one value per attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, String>,
}

/// User operations a pooled directory connection supports.
#[async_trait]
pub trait Directory: Connection {
    /// Find `user_id` and bind as it with `password`.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown user or wrong password
    /// * `Backend` - Directory failure
    async fn authenticate(
        &mut self,
        user_id: &str,
        password: &str,
    ) -> Result<DirectoryEntry, StoreError>;

    /// # Errors
    /// * `NotFound` - No entry for `user_id`
    /// * `Backend` - Directory failure
    async fn find_user(&mut self, user_id: &str) -> Result<DirectoryEntry, StoreError>;
}

/// Credential store backed by a directory server.
pub struct LdapUserStore<D: Dialer> {
    pool: ConnectionPool<D>,
    config: Arc<LdapConfig>,
}

impl LdapUserStore<LdapDialer> {
    pub fn from_config(config: LdapConfig) -> Self {
        let config = Arc::new(config);
        let dialer = LdapDialer::new(Arc::clone(&config));
        tracing::info!(
            url = %config.url(),
            base = %config.base,
            pool_capacity = config.pool_capacity,
            "Directory user store configured"
        );

        Self::new(ConnectionPool::new(config.pool_capacity, dialer), config)
    }
}

impl<D> LdapUserStore<D>
where
    D: Dialer,
    D::Connection: Directory,
{
    pub fn new(pool: ConnectionPool<D>, config: Arc<LdapConfig>) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &ConnectionPool<D> {
        &self.pool
    }

    fn user_from(&self, fallback_id: &str, mut entry: DirectoryEntry) -> SharedUser {
        let id = entry
            .attributes
            .remove(&self.config.id_attr)
            .unwrap_or_else(|| fallback_id.to_string());
        let name = entry
            .attributes
            .remove(&self.config.display_name_attr)
            .unwrap_or_else(|| id.clone());
        let email = entry
            .attributes
            .remove(&self.config.email_attr)
            .unwrap_or_default();

        let admin = self.config.is_admin(&id);

        let mut user = StdUser::new(id, name)
            .with_email(email)
            .with_admin(admin);
        for attribute in &self.config.attributes {
            if let Some(value) = entry.attributes.remove(attribute) {
                user = user.with_claim(attribute, value);
            }
        }

        Arc::new(user)
    }
}

#[async_trait]
impl<D> UserStore for LdapUserStore<D>
where
    D: Dialer,
    D::Connection: Directory,
{
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SharedUser, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = conn.authenticate(username, password).await;
        self.pool.release(conn).await;

        result.map(|entry| self.user_from(username, entry))
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<SharedUser, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = conn.find_user(user_id).await;
        self.pool.release(conn).await;

        result.map(|entry| self.user_from(user_id, entry))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
