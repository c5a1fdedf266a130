use std::env;

use auth::jwt::keys::is_hmac;
use auth::jwt::keys::keys_from_pem;
use auth::jwt::keys::process_secret;
use auth::TokenCodec;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::inbound::http::errors::ErrorFormat;
use crate::inbound::http::errors::ErrorRenderer;
use crate::inbound::http::middleware::DEFAULT_TOKEN_COOKIE;
use crate::inbound::http::middleware::DEFAULT_TOKEN_QUERY_KEY;
use crate::outbound::ldap::LdapConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub errors: ErrorsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Longest accepted token lifetime, ten years.
pub const MAX_TOKEN_TTL_HOURS: i64 = 10 * 365 * 24;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret; a random per-process key is used when absent
    pub secret: Option<String>,
    pub algorithm: Algorithm,
    pub ttl_hours: i64,
    /// Defaults to the `HOSTNAME` environment variable
    pub issuer: Option<String>,
    pub query_key: String,
    pub cookie_name: String,
    pub private_key_pem: Option<String>,
    pub public_key_pem: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            algorithm: Algorithm::HS256,
            ttl_hours: auth::authenticator::DEFAULT_TOKEN_TTL_HOURS,
            issuer: None,
            query_key: DEFAULT_TOKEN_QUERY_KEY.to_string(),
            cookie_name: DEFAULT_TOKEN_COOKIE.to_string(),
            private_key_pem: None,
            public_key_pem: None,
        }
    }
}

impl TokenConfig {
    pub fn issuer(&self) -> String {
        self.issuer
            .clone()
            .filter(|issuer| !issuer.is_empty())
            .or_else(|| env::var("HOSTNAME").ok().filter(|host| !host.is_empty()))
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// Token lifetime.
    ///
    /// # Errors
    /// * `Message` - `ttl_hours` is not between 1 and [`MAX_TOKEN_TTL_HOURS`]
    pub fn ttl(&self) -> Result<chrono::Duration, ConfigError> {
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.ttl_hours) {
            return Err(ConfigError::Message(format!(
                "token.ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {}",
                self.ttl_hours
            )));
        }

        Ok(chrono::Duration::hours(self.ttl_hours))
    }

    /// Build the signing codec for the configured algorithm.
    ///
    /// # Errors
    /// * `Message` - Asymmetric algorithm without usable PEM keys
    pub fn build_codec(&self) -> Result<TokenCodec, ConfigError> {
        let issuer = self.issuer();

        if is_hmac(self.algorithm) {
            let codec = match self.secret.as_deref().filter(|secret| !secret.is_empty()) {
                Some(secret) => TokenCodec::hmac(self.algorithm, secret.as_bytes(), issuer),
                None => TokenCodec::hmac(self.algorithm, process_secret(), issuer),
            };
            return Ok(codec);
        }

        let (Some(private_key), Some(public_key)) = (&self.private_key_pem, &self.public_key_pem)
        else {
            return Err(ConfigError::Message(format!(
                "token algorithm {:?} requires token.private_key_pem and token.public_key_pem",
                self.algorithm
            )));
        };

        let (encoding_key, decoding_key) =
            keys_from_pem(self.algorithm, private_key.as_bytes(), public_key.as_bytes())
                .map_err(|e| ConfigError::Message(format!("invalid token key material: {e}")))?;

        Ok(TokenCodec::with_keys(
            self.algorithm,
            encoding_key,
            decoding_key,
            issuer,
        ))
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct ErrorsConfig {
    pub format: ErrorFormat,
    /// Include store and directory causes in error bodies
    pub expose_cause: bool,
}

impl ErrorsConfig {
    pub fn renderer(&self) -> ErrorRenderer {
        ErrorRenderer::new(self.format, self.expose_cause)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Ldap,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub users: Vec<UserRecord>,
    pub ldap: Option<LdapConfig>,
}

/// User entry of the in-memory store.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub admin: bool,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TOKEN__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: TOKEN__TTL_HOURS=24 overrides token.ttl_hours
            .add_source(Environment::default().separator("__"))
            .build()?;

        configuration.try_deserialize()
    }
}
