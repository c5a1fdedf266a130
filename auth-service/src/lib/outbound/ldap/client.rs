use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ldap3::ldap_escape;
use ldap3::Ldap;
use ldap3::LdapConnAsync;
use ldap3::LdapConnSettings;
use ldap3::LdapError;
use ldap3::Scope;
use ldap3::SearchEntry;

use super::config::LdapConfig;
use super::pool::Connection;
use super::pool::Dialer;
use super::pool::PoolError;
use super::store::Directory;
use super::store::DirectoryEntry;
use crate::user::errors::StoreError;

const RC_SUCCESS: u32 = 0;
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Opens connections to the configured directory server.
#[derive(Debug, Clone)]
pub struct LdapDialer {
    config: Arc<LdapConfig>,
}

impl LdapDialer {
    pub fn new(config: Arc<LdapConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Dialer for LdapDialer {
    type Connection = LdapConnection;

    async fn dial(&self) -> Result<LdapConnection, PoolError> {
        let url = self.config.url();
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connect_timeout())
            .set_no_tls_verify(self.config.insecure_skip_verify);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Failed to connect to directory");
                PoolError::Dial(e.to_string())
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "Directory connection terminated");
            }
        });
        tracing::debug!(url = %url, "Directory connection established");

        Ok(LdapConnection {
            ldap,
            config: Arc::clone(&self.config),
        })
    }
}

/// One live directory connection, bound as the service account between
/// operations.
pub struct LdapConnection {
    ldap: Ldap,
    config: Arc<LdapConfig>,
}

impl LdapConnection {
    async fn service_bind(&mut self) -> Result<(), StoreError> {
        self.ldap
            .simple_bind(&self.config.bind_dn, &self.config.bind_password)
            .await
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| StoreError::Backend(format!("service bind failed: {e}")))
    }

    async fn search_user(&mut self, user_id: &str) -> Result<DirectoryEntry, StoreError> {
        let filter = user_filter(&self.config.user_filter, user_id);

        let (entries, _) = self
            .ldap
            .search(
                &self.config.base,
                Scope::Subtree,
                &filter,
                self.config.requested_attributes(),
            )
            .await
            .and_then(|result| result.success())
            .map_err(directory_error)?;

        let mut entries = entries.into_iter();
        match (entries.next(), entries.next()) {
            (Some(entry), None) => Ok(entry_from(SearchEntry::construct(entry))),
            (None, _) => Err(StoreError::NotFound(user_id.to_string())),
            (Some(_), Some(_)) => Err(StoreError::Backend(format!(
                "filter {filter} matches more than one entry"
            ))),
        }
    }
}

#[async_trait]
impl Connection for LdapConnection {
    async fn is_alive(&mut self) -> bool {
        let timeout = self.config.connect_timeout();
        self.ldap
            .with_timeout(timeout)
            .search("", Scope::Base, "(objectClass=*)", vec!["1.1"])
            .await
            .and_then(|result| result.success())
            .is_ok()
    }

    async fn close(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            tracing::debug!(error = %e, "Directory unbind failed");
        }
    }
}

#[async_trait]
impl Directory for LdapConnection {
    async fn authenticate(
        &mut self,
        user_id: &str,
        password: &str,
    ) -> Result<DirectoryEntry, StoreError> {
        // An empty password would be an unauthenticated bind, which succeeds.
        if password.is_empty() {
            return Err(StoreError::InvalidCredentials);
        }

        self.service_bind().await?;
        let entry = self.search_user(user_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => StoreError::InvalidCredentials,
            other => other,
        })?;

        let user_bind = self
            .ldap
            .simple_bind(&entry.dn, password)
            .await
            .map_err(directory_error)?;

        // Every operation binds as the service account first, so a failed
        // rebind here only affects this connection's idle state.
        if let Err(e) = self.service_bind().await {
            tracing::warn!(error = %e, "Service rebind after user bind failed");
        }

        bind_outcome(entry, user_bind.rc, &user_bind.text)
    }

    async fn find_user(&mut self, user_id: &str) -> Result<DirectoryEntry, StoreError> {
        self.service_bind().await?;
        self.search_user(user_id).await
    }
}

/// Substitute the escaped `user_id` for every `%s` in `template`.
fn user_filter(template: &str, user_id: &str) -> String {
    template.replace("%s", &ldap_escape(user_id))
}

fn bind_outcome(entry: DirectoryEntry, rc: u32, text: &str) -> Result<DirectoryEntry, StoreError> {
    match rc {
        RC_SUCCESS => Ok(entry),
        RC_INVALID_CREDENTIALS => Err(StoreError::InvalidCredentials),
        rc => Err(StoreError::Backend(format!("user bind returned {rc}: {text}"))),
    }
}

fn entry_from(entry: SearchEntry) -> DirectoryEntry {
    let attributes: HashMap<String, String> = entry
        .attrs
        .into_iter()
        .filter_map(|(name, values)| values.into_iter().next().map(|value| (name, value)))
        .collect();

    DirectoryEntry {
        dn: entry.dn,
        attributes,
    }
}

fn directory_error(err: LdapError) -> StoreError {
    StoreError::Backend(err.to_string())
}
