use std::time::Duration;

use serde::Deserialize;

pub const PLAIN_LDAP_PORT: u16 = 389;

/// Directory connection and lookup settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LdapConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Search base for user entries, e.g. `ou=people,dc=example,dc=org`
    pub base: String,
    /// Service account used for searches
    pub bind_dn: String,
    pub bind_password: String,
    /// Search filter with `%s` standing for the escaped user id
    #[serde(default = "default_user_filter")]
    pub user_filter: String,
    /// Attribute holding the user id
    #[serde(default = "default_id_attr")]
    pub id_attr: String,
    #[serde(default = "default_display_name_attr")]
    pub display_name_attr: String,
    #[serde(default = "default_email_attr")]
    pub email_attr: String,
    /// Extra attributes copied into the user's claims
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub admin_ids: Vec<String>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    /// Idle connections kept; 0 dials for every request
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_port() -> u16 {
    PLAIN_LDAP_PORT
}

fn default_user_filter() -> String {
    "(uid=%s)".to_string()
}

fn default_id_attr() -> String {
    "uid".to_string()
}

fn default_display_name_attr() -> String {
    "displayName".to_string()
}

fn default_email_attr() -> String {
    "mail".to_string()
}

fn default_pool_capacity() -> usize {
    8
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl LdapConfig {
    /// `ldap://` on the plain port, `ldaps://` everywhere else.
    pub fn url(&self) -> String {
        let scheme = if self.port == PLAIN_LDAP_PORT {
            "ldap"
        } else {
            "ldaps"
        };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == user_id)
    }

    /// Attributes requested for every user entry.
    pub fn requested_attributes(&self) -> Vec<&str> {
        let mut requested = vec![
            self.id_attr.as_str(),
            self.display_name_attr.as_str(),
            self.email_attr.as_str(),
        ];
        for attribute in &self.attributes {
            if !requested.contains(&attribute.as_str()) {
                requested.push(attribute);
            }
        }
        requested
    }
}
