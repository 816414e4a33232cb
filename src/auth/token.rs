//! Signed, self-contained session tokens.
//!
//! Tokens are HS256 JWTs: `header.payload.signature`, where the payload holds
//! the subject id, issued-at and expiry. Nothing is stored server side, so
//! expiry is the only way a token stops being accepted.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, SecretKeyError};

/// Minimum accepted secret length: 256 bits.
pub const MIN_SECRET_BYTES: usize = 32;

/// Claims
///
/// Payload of every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account id the token was issued to.
    pub sub: Uuid,
    /// Issued at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// TokenCodec
///
/// Issues and verifies tokens with a single server-held HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("encoding", &"<redacted>")
            .field("decoding", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenCodec {
    /// Builds a codec from a base64 secret.
    ///
    /// # Errors
    /// Rejects a missing secret, one that is not base64, or one that decodes to
    /// fewer than 256 bits. Callers at boot treat any of these as fatal.
    pub fn from_base64_secret(secret: &str, ttl: Duration) -> Result<Self, SecretKeyError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(SecretKeyError::Missing);
        }
        let bytes = STANDARD
            .decode(secret)
            .map_err(|_| SecretKeyError::NotBase64)?;
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(SecretKeyError::TooShort {
                bits: bytes.len() * 8,
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            encoding: EncodingKey::from_secret(&bytes),
            decoding: DecodingKey::from_secret(&bytes),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `subject`, valid from now for the configured TTL.
    pub fn issue(&self, subject: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(subject, Utc::now())
    }

    /// Issues a token as if it had been created at `issued_at`.
    pub fn issue_at(
        &self,
        subject: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let ttl = TimeDelta::seconds(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX / 1000));
        let claims = Claims {
            sub: subject,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verifies signature and expiry, returning the claims.
    ///
    /// The signature is recomputed over `header.payload` and compared in
    /// constant time by `jsonwebtoken`; expiry is only checked on a token whose
    /// signature verified.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        if token.split('.').count() != 3 {
            return Err(AuthError::Malformed);
        }
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            })
    }
}
