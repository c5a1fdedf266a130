use std::sync::OnceLock;

use jsonwebtoken::errors::Error as KeyError;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use rand::RngCore;

/// Length in bytes of generated HMAC secrets.
pub const SECRET_LENGTH: usize = 32;

/// Generate a fresh random HMAC secret.
pub fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; SECRET_LENGTH];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// Secret shared by every codec in this process that was not given one.
///
/// Generated on first use and fixed for the lifetime of the process, so
/// tokens issued before a restart stop verifying after it.
pub fn process_secret() -> &'static [u8] {
    static SECRET: OnceLock<Vec<u8>> = OnceLock::new();
    SECRET.get_or_init(|| {
        tracing::warn!("No signing secret configured, using a random per-process key");
        generate_secret()
    })
}

pub fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

/// Build an asymmetric key pair for `algorithm` from PEM material.
///
/// # Errors
/// * `InvalidKeyFormat` - PEM data does not match the algorithm family
pub fn keys_from_pem(
    algorithm: Algorithm,
    private_key_pem: &[u8],
    public_key_pem: &[u8],
) -> Result<(EncodingKey, DecodingKey), KeyError> {
    match algorithm {
        Algorithm::ES256 | Algorithm::ES384 => Ok((
            EncodingKey::from_ec_pem(private_key_pem)?,
            DecodingKey::from_ec_pem(public_key_pem)?,
        )),
        Algorithm::EdDSA => Ok((
            EncodingKey::from_ed_pem(private_key_pem)?,
            DecodingKey::from_ed_pem(public_key_pem)?,
        )),
        _ => Ok((
            EncodingKey::from_rsa_pem(private_key_pem)?,
            DecodingKey::from_rsa_pem(public_key_pem)?,
        )),
    }
}
