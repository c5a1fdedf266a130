use chrono::DateTime;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims;
use super::claims::ClaimMap;
use super::token::Token;
use crate::errors::AuthError;

/// Signs tokens into compact JWS strings and verifies them back.
///
/// Holds the process-wide signing material and the issuer identity this
/// instance stamps on, and expects from, every token.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
}

impl TokenCodec {
    /// Create an HS256 codec.
    ///
    /// # Arguments
    /// * `secret` - HMAC secret, at least 32 bytes recommended
    /// * `issuer` - Identity written to `iss` and required on verification
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self::hmac(Algorithm::HS256, secret, issuer)
    }

    /// Create a codec for one of the HMAC algorithms.
    pub fn hmac(algorithm: Algorithm, secret: &[u8], issuer: impl Into<String>) -> Self {
        Self::with_keys(
            algorithm,
            EncodingKey::from_secret(secret),
            DecodingKey::from_secret(secret),
            issuer,
        )
    }

    /// Create a codec from prepared keys. Mismatched key material is not
    /// detected here; it surfaces as `EncodeFailed` on the first `encode`.
    pub fn with_keys(
        algorithm: Algorithm,
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            encoding_key,
            decoding_key,
            algorithm,
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign `token` into a compact string.
    ///
    /// # Errors
    /// * `MissingUserID` - Token has an empty subject
    /// * `EncodeFailed` - Signing failed, a server configuration fault
    pub fn encode(&self, token: &Token) -> Result<String, AuthError> {
        if token.user_id.is_empty() {
            return Err(AuthError::MISSING_USER_ID);
        }

        let header = Header::new(self.algorithm);

        encode(&header, &token.to_claims(&self.issuer), &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, algorithm = ?self.algorithm, "Token signing failed");
            AuthError::ENCODE_FAILED.with_cause(e)
        })
    }

    /// Verify `token` and rebuild its claim set.
    ///
    /// The signature is always checked first. Then, in order: subject present,
    /// expiration present, issuer matches, client address matches.
    ///
    /// # Arguments
    /// * `expected_client_address` - Address of the current request; `None` or
    ///   empty skips the binding check
    /// * `allow_expired` - Accept tokens past their expiration (refresh flows)
    ///
    /// # Errors
    /// * `InvalidToken` - Bad signature, malformed structure, expired or `exp` out of range
    /// * `MissingUserID` - No non-empty `user_id` claim
    /// * `MissingExpiration` - No usable `exp` claim
    /// * `InvalidIssuer` - `iss` names another issuer
    /// * `InvalidClientAddress` - Token is bound to another address
    pub fn verify(
        &self,
        token: &str,
        expected_client_address: Option<&str>,
        allow_expired: bool,
    ) -> Result<Token, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // Presence of exp and friends is checked below with our own errors.
        validation.required_spec_claims.clear();
        validation.validate_exp = !allow_expired;
        validation.validate_aud = false;
        validation.leeway = 0;

        let mut payload = decode::<ClaimMap>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::INVALID_TOKEN.with_cause("token has expired"),
                _ => AuthError::INVALID_TOKEN.with_cause(e),
            })?
            .claims;

        let user_id = claims::claim_string(&payload, claims::USER_ID)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .ok_or(AuthError::MISSING_USER_ID)?;

        let expires_at = claims::claim_seconds(&payload, claims::EXPIRES_AT)
            .ok_or(AuthError::MISSING_EXPIRATION)?;
        let expires_at = DateTime::from_timestamp(expires_at, 0)
            .ok_or_else(|| AuthError::INVALID_TOKEN.with_cause("exp is out of range"))?;

        if !allow_expired && expires_at < Utc::now() {
            return Err(AuthError::INVALID_TOKEN.with_cause("token has expired"));
        }

        let issuer = claims::claim_string(&payload, claims::ISSUER).map(str::to_owned);
        if issuer.as_deref().is_some_and(|iss| iss != self.issuer) {
            return Err(AuthError::INVALID_ISSUER);
        }

        let client_address = claims::claim_string(&payload, claims::CLIENT_ADDRESS)
            .filter(|address| !address.is_empty())
            .map(str::to_owned);
        let expected = expected_client_address.filter(|address| !address.is_empty());
        if let (Some(bound), Some(expected)) = (client_address.as_deref(), expected) {
            if bound != expected {
                return Err(AuthError::INVALID_CLIENT_ADDRESS);
            }
        }

        // iat is informational only.
        let issued_at = claims::claim_time(&payload, claims::ISSUED_AT).unwrap_or(DateTime::<Utc>::default());
        let user_name = claims::claim_string(&payload, claims::USER_NAME)
            .unwrap_or_default()
            .to_owned();
        let domain = claims::claim_string(&payload, claims::DOMAIN)
            .filter(|domain| !domain.is_empty())
            .map(str::to_owned);

        payload.retain(|key, _| !claims::is_standard(key));

        Ok(Token {
            user_id,
            user_name,
            domain,
            issued_at,
            expires_at,
            issuer,
            client_address,
            claims: payload,
        })
    }
}
