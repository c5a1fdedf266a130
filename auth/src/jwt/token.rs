use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::claims;
use super::claims::ClaimMap;

/// Issued session: who the token speaks for, who issued it and for how long.
///
/// Built once at issuance time and never mutated afterwards; verification
/// produces a fresh read-only copy per request.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub user_id: String,
    pub user_name: String,
    pub domain: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// `None` means "the issuing codec's identity".
    pub issuer: Option<String>,
    pub client_address: Option<String>,
    /// Custom claims, merged at the top level of the encoded payload.
    pub claims: ClaimMap,
}

impl Token {
    /// Create a token issued now and valid for `ttl`.
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>, ttl: Duration) -> Self {
        Self::issued(user_id, user_name, Utc::now(), ttl)
    }

    /// Create a token issued at `issued_at`. A negative `ttl` is treated as zero
    /// so the expiration never precedes the issue time, and an expiration past
    /// the representable range saturates at `DateTime::<Utc>::MAX_UTC`.
    pub fn issued(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let ttl = ttl.max(Duration::zero());

        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            domain: None,
            issued_at,
            expires_at: issued_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            issuer: None,
            client_address: None,
            claims: ClaimMap::new(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Bind the token to a client address. Empty addresses leave it unbound.
    pub fn with_client_address(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        self.client_address = (!address.is_empty()).then_some(address);
        self
    }

    /// Add a custom claim. Values that fail to serialize are skipped.
    pub fn with_claim(mut self, key: impl ToString, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.claims.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn with_claims(mut self, claims: ClaimMap) -> Self {
        self.claims.extend(claims);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Payload written to the wire.
    ///
    /// Custom claims go in first and the standard claims overwrite them, so a
    /// caller cannot smuggle in its own `exp` or `user_id`.
    pub(crate) fn to_claims(&self, default_issuer: &str) -> ClaimMap {
        let mut payload = self.claims.clone();

        let issuer = self
            .issuer
            .as_deref()
            .filter(|issuer| !issuer.is_empty())
            .unwrap_or(default_issuer);

        payload.insert(claims::ISSUER.into(), Value::from(issuer));
        payload.insert(claims::ISSUED_AT.into(), Value::from(self.issued_at.timestamp()));
        payload.insert(claims::USER_ID.into(), Value::from(self.user_id.as_str()));
        payload.insert(claims::USER_NAME.into(), Value::from(self.user_name.as_str()));
        payload.insert(
            claims::DOMAIN.into(),
            Value::from(self.domain.clone().unwrap_or_default()),
        );
        payload.insert(claims::EXPIRES_AT.into(), Value::from(self.expires_at.timestamp()));

        match &self.client_address {
            Some(address) => {
                payload.insert(claims::CLIENT_ADDRESS.into(), Value::from(address.as_str()));
            }
            None => {
                payload.remove(claims::CLIENT_ADDRESS);
            }
        }

        payload
    }
}
