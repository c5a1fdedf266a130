use auth::ClaimMap;
use serde::Serialize;

use crate::user::ports::User;

/// Plain user record returned by the bundled stores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StdUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub admin: bool,
    pub domain: Option<String>,
    pub claims: ClaimMap,
}

impl StdUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Add a custom claim. Values that fail to serialize are skipped.
    pub fn with_claim(mut self, key: impl ToString, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.claims.insert(key.to_string(), json_value);
        }
        self
    }
}

impl User for StdUser {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn is_admin(&self) -> bool {
        self.admin
    }

    fn claims(&self) -> &ClaimMap {
        &self.claims
    }

    fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}
