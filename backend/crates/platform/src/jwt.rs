//! HS256 JSON Web Tokens
//!
//! The codec is claim-agnostic: callers define their own claim structs.
//! Every claim struct must carry an `exp` (seconds since epoch).

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Shortest secret accepted for HS256
pub const MIN_SECRET_LEN: usize = 32;

/// Clock skew tolerated when checking `exp`
const LEEWAY_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,

    #[error("Token has expired")]
    Expired,

    #[error("Token is invalid")]
    Invalid,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::WeakSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = LEEWAY_SECS;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn encode<C: Serialize>(&self, claims: &C) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, then deserialize the claims
    pub fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<C, JwtError> {
        decode::<C>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid,
            })
    }
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec").finish_non_exhaustive()
    }
}

/// Seconds since the Unix epoch
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestClaims {
        sub: String,
        exp: i64,
    }

    fn codec() -> JwtCodec {
        JwtCodec::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_weak_secret_rejected() {
        assert!(matches!(JwtCodec::new(b"short"), Err(JwtError::WeakSecret)));
    }

    #[test]
    fn test_encode_decode() {
        let claims = TestClaims {
            sub: "V1StGXR8_Z5jdHi6B-myT".to_string(),
            exp: unix_now() + 60,
        };
        let token = codec().encode(&claims).unwrap();
        let decoded: TestClaims = codec().decode(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_expired_token() {
        let claims = TestClaims {
            sub: "x".to_string(),
            exp: unix_now() - 3600,
        };
        let token = codec().encode(&claims).unwrap();
        assert!(matches!(
            codec().decode::<TestClaims>(&token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let claims = TestClaims {
            sub: "x".to_string(),
            exp: unix_now() + 60,
        };
        let token = codec().encode(&claims).unwrap();
        let other = JwtCodec::new(&[8u8; 32]).unwrap();
        assert!(matches!(
            other.decode::<TestClaims>(&token),
            Err(JwtError::Invalid)
        ));
        assert!(matches!(
            codec().decode::<TestClaims>("not.a.jwt"),
            Err(JwtError::Invalid)
        ));
    }
}
