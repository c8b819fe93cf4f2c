//! JWT claims decoding
//!
//! Verifies credential signatures and extracts identity claims. Expiry is
//! carried as a field and checked by the validator, not here.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role assumed when a credential carries none
pub const DEFAULT_ROLE: &str = "ROLE_USER";

/// Lifetime of credentials minted by [`Claims::for_user`] (5 hours)
pub const TOKEN_VALIDITY_HOURS: i64 = 5;

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Decoded credential payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
    /// Caller role
    #[serde(default = "default_role")]
    pub role: String,
    /// Numeric user id
    #[serde(rename = "userId", default)]
    pub user_id: i64,
}

impl Claims {
    /// Claims for a freshly issued credential valid for [`TOKEN_VALIDITY_HOURS`]
    pub fn for_user(username: &str, role: &str, user_id: i64) -> Self {
        Self {
            sub: Some(username.to_string()),
            exp: (Utc::now() + Duration::hours(TOKEN_VALIDITY_HOURS)).timestamp(),
            role: role.to_string(),
            user_id,
        }
    }

    /// Resolved username, if present and not blank
    pub fn username(&self) -> Option<&str> {
        self.sub.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Expiry as an instant. `None` when the timestamp is out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Why a credential could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed credential: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    #[error("credential signature does not verify")]
    InvalidSignature,

    #[error("credential could not be decoded: {0}")]
    Other(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for DecodeError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => DecodeError::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => DecodeError::Malformed(e),
            _ => DecodeError::Other(e),
        }
    }
}

/// HMAC-SHA256 credential verifier built once from the signing secret.
///
/// Holds no mutable state; safe to share across request tasks.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtDecoder")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

impl JwtDecoder {
    pub fn from_secret(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is a validator concern
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify the signature and decode the payload
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Sign claims with the shared secret
pub fn issue_token(secret: &str, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "unit-test-secret";

    fn sign_raw(payload: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_valid_token() {
        let claims = Claims::for_user("alice", "ROLE_ADMIN", 42);
        let token = issue_token(SECRET, &claims).unwrap();

        let decoded = JwtDecoder::from_secret(SECRET).decode(&token).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.username(), Some("alice"));
    }

    #[test]
    fn test_missing_role_and_user_id_use_defaults() {
        let token = sign_raw(
            serde_json::json!({ "sub": "bob", "exp": Utc::now().timestamp() + 60 }),
            SECRET,
        );

        let decoded = JwtDecoder::from_secret(SECRET).decode(&token).unwrap();
        assert_eq!(decoded.role, DEFAULT_ROLE);
        assert_eq!(decoded.user_id, 0);
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = sign_raw(
            serde_json::json!({ "sub": "carol", "exp": Utc::now().timestamp() - 3600 }),
            SECRET,
        );

        let decoded = JwtDecoder::from_secret(SECRET).decode(&token).unwrap();
        assert!(decoded.expires_at().unwrap() < Utc::now());
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let token = issue_token("some-other-secret", &Claims::for_user("dave", "ROLE_USER", 1))
            .unwrap();

        let err = JwtDecoder::from_secret(SECRET).decode(&token).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = JwtDecoder::from_secret(SECRET).decode("not-a-jwt").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_missing_exp_is_rejected() {
        let token = sign_raw(serde_json::json!({ "sub": "erin" }), SECRET);

        let err = JwtDecoder::from_secret(SECRET).decode(&token).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_blank_subject_has_no_username() {
        let mut claims = Claims::for_user("  ", "ROLE_USER", 1);
        assert_eq!(claims.username(), None);
        claims.sub = None;
        assert_eq!(claims.username(), None);
    }
}
