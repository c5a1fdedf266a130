use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;

/// Claim set carried by a token, keyed by claim name.
pub type ClaimMap = serde_json::Map<String, Value>;

pub const ISSUER: &str = "iss";
pub const ISSUED_AT: &str = "iat";
pub const EXPIRES_AT: &str = "exp";
pub const USER_ID: &str = "user_id";
pub const USER_NAME: &str = "user_name";
pub const DOMAIN: &str = "domain";
/// Bound client address travels in the audience claim.
pub const CLIENT_ADDRESS: &str = "aud";

/// Claims written by the codec itself. Caller-supplied claims never
/// override these.
pub const STANDARD_CLAIMS: [&str; 7] = [
    ISSUER,
    ISSUED_AT,
    EXPIRES_AT,
    USER_ID,
    USER_NAME,
    DOMAIN,
    CLIENT_ADDRESS,
];

pub fn is_standard(key: &str) -> bool {
    STANDARD_CLAIMS.contains(&key)
}

/// String value of `key`, or `None` when absent or not a string.
pub fn claim_string<'a>(claims: &'a ClaimMap, key: &str) -> Option<&'a str> {
    claims.get(key).and_then(Value::as_str)
}

/// Unix seconds stored under `key`.
///
/// Accepts an integer, a float or a numeric string.
pub fn claim_seconds(claims: &ClaimMap, key: &str) -> Option<i64> {
    match claims.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Timestamp value of `key`. `None` also covers seconds outside chrono's range.
pub fn claim_time(claims: &ClaimMap, key: &str) -> Option<DateTime<Utc>> {
    claim_seconds(claims, key).and_then(|seconds| DateTime::from_timestamp(seconds, 0))
}
