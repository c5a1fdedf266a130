use chrono::Duration;
use chrono::Utc;

use crate::errors::AuthError;
use crate::jwt::ClaimMap;
use crate::jwt::Token;
use crate::jwt::TokenCodec;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 7 * 24;

/// Token issuance coordinator.
///
/// Pairs a [`TokenCodec`] with the configured token lifetime so callers
/// only supply who the token is for.
pub struct Authenticator {
    codec: TokenCodec,
    ttl: Duration,
}

/// Identity a token is issued for.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub domain: Option<&'a str>,
}

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Signed token string handed to the client
    pub access_token: String,
    /// Claims that were signed
    pub token: Token,
}

impl Authenticator {
    pub fn new(codec: TokenCodec, ttl: Duration) -> Self {
        Self { codec, ttl }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for `subject`, valid from now for the configured TTL.
    ///
    /// # Arguments
    /// * `subject` - User the token speaks for
    /// * `client_address` - Address to bind the token to, if any
    /// * `extra_claims` - Custom claims; standard claims win on collision
    ///
    /// # Errors
    /// * `MissingUserID` - Subject id is empty
    /// * `EncodeFailed` - Signing failed or the expiration is out of range
    pub fn issue(
        &self,
        subject: Subject<'_>,
        client_address: Option<&str>,
        extra_claims: &ClaimMap,
    ) -> Result<IssuedToken, AuthError> {
        let issued_at = Utc::now();
        if issued_at.checked_add_signed(self.ttl).is_none() {
            tracing::error!(ttl_seconds = self.ttl.num_seconds(), "Token lifetime overflows the expiration");
            return Err(AuthError::ENCODE_FAILED.with_cause("token expiration is out of range"));
        }

        let mut token = Token::issued(subject.id, subject.name, issued_at, self.ttl)
            .with_claims(extra_claims.clone());
        if let Some(domain) = subject.domain {
            token = token.with_domain(domain);
        }
        if let Some(address) = client_address {
            token = token.with_client_address(address);
        }

        let access_token = self.codec.encode(&token)?;

        Ok(IssuedToken {
            access_token,
            token,
        })
    }

    /// Verify a token string. See [`TokenCodec::verify`].
    pub fn validate_token(
        &self,
        access_token: &str,
        client_address: Option<&str>,
        allow_expired: bool,
    ) -> Result<Token, AuthError> {
        self.codec.verify(access_token, client_address, allow_expired)
    }
}
