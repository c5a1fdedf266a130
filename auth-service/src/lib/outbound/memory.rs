use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use auth::password::verify_password;
use parking_lot::RwLock;

use crate::config::UserRecord;
use crate::user::errors::StoreError;
use crate::user::models::StdUser;
use crate::user::ports::SharedUser;
use crate::user::ports::UserStore;

struct StoredUser {
    user: Arc<StdUser>,
    password_hash: String,
}

/// Credential store holding users and Argon2 hashes in memory.
///
/// Users log in with their id or their email address.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[UserRecord]) -> Self {
        let store = Self::new();
        for record in records {
            let user = StdUser::new(&record.id, &record.name)
                .with_email(&record.email)
                .with_admin(record.admin);
            store.insert(user, &record.password_hash);
        }
        tracing::info!(users = records.len(), "In-memory user store loaded");
        store
    }

    pub fn with_user(self, user: StdUser, password_hash: impl Into<String>) -> Self {
        self.insert(user, password_hash);
        self
    }

    pub fn insert(&self, user: StdUser, password_hash: impl Into<String>) {
        let stored = StoredUser {
            user: Arc::new(user),
            password_hash: password_hash.into(),
        };
        self.users.write().insert(stored.user.id.clone(), stored);
    }

    fn lookup(&self, login: &str) -> Option<(Arc<StdUser>, String)> {
        let users = self.users.read();
        users
            .get(login)
            .or_else(|| {
                users
                    .values()
                    .find(|stored| !stored.user.email.is_empty() && stored.user.email == login)
            })
            .map(|stored| (Arc::clone(&stored.user), stored.password_hash.clone()))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SharedUser, StoreError> {
        let (user, password_hash) = self
            .lookup(username)
            .ok_or(StoreError::InvalidCredentials)?;

        let verified = verify_password(password, &password_hash).map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            StoreError::Backend(e.to_string())
        })?;

        if !verified {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<SharedUser, StoreError> {
        self.users
            .read()
            .get(user_id)
            .map(|stored| Arc::clone(&stored.user) as SharedUser)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    async fn close(&self) {
        tracing::debug!("In-memory user store closed");
    }
}
