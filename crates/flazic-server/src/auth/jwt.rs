use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Map a configured algorithm name to the signing algorithm. Unknown names
/// fall back to HS256; `main` logs a warning for them at startup.
pub fn parse_algorithm(name: &str) -> Algorithm {
    match name {
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        _ => Algorithm::HS256,
    }
}

/// Issue a signed access token for `user_id`, valid for `ttl_minutes`.
pub fn issue_token(
    user_id: Uuid,
    secret: &str,
    algorithm: Algorithm,
    ttl_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
    };
    encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate a token's signature and expiry, returning the claims.
///
/// Malformed tokens, bad signatures, and expired tokens are all `Err`; the
/// middleware turns any `Err` into a 401 without distinguishing them.
pub fn validate_token(
    token: &str,
    secret: &str,
    algorithm: Algorithm,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(algorithm),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt";

    #[test]
    fn test_issue_and_validate_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, SECRET, Algorithm::HS256, 60).unwrap();
        assert!(!token.is_empty());

        let claims = validate_token(&token, SECRET, Algorithm::HS256).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_ttl_is_encoded_in_claims() {
        let token = issue_token(Uuid::new_v4(), SECRET, Algorithm::HS256, 60).unwrap();
        let claims = validate_token(&token, SECRET, Algorithm::HS256).unwrap();
        let diff = claims.exp - claims.iat;
        assert!((3599..=3601).contains(&diff));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s validation leeway
        let token = issue_token(Uuid::new_v4(), SECRET, Algorithm::HS256, -2).unwrap();
        assert!(validate_token(&token, SECRET, Algorithm::HS256).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(Uuid::new_v4(), SECRET, Algorithm::HS256, 60).unwrap();
        assert!(validate_token(&token, "wrong-secret", Algorithm::HS256).is_err());
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        let token = issue_token(Uuid::new_v4(), SECRET, Algorithm::HS384, 60).unwrap();
        assert!(validate_token(&token, SECRET, Algorithm::HS256).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validate_token("not-a-valid-jwt", SECRET, Algorithm::HS256).is_err());
        assert!(validate_token("", SECRET, Algorithm::HS256).is_err());
    }

    #[test]
    fn test_uuid_sub_roundtrip() {
        let user_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let token = issue_token(user_id, SECRET, Algorithm::HS256, 60).unwrap();
        let claims = validate_token(&token, SECRET, Algorithm::HS256).unwrap();
        assert_eq!(
            claims.sub.to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(parse_algorithm("HS256"), Algorithm::HS256);
        assert_eq!(parse_algorithm("HS384"), Algorithm::HS384);
        assert_eq!(parse_algorithm("HS512"), Algorithm::HS512);
        assert_eq!(parse_algorithm("none"), Algorithm::HS256);
    }
}
