//! Signed session tokens (HS256)
//!
//! The claims mirror the user's role and strand so clients can render
//! without a round trip. Requests never trust them for authorization:
//! [`super::resolve_principal`] reloads the user on every call.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::identity::{Role, Strand, User, UserId};
use crate::types::EncvError;

/// Shortest secret accepted for signing
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub username: String,
    pub role: Option<Role>,
    pub strand: Option<Strand>,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens with one shared secret
#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SessionTokens {
    pub fn new(secret: &str, lifetime_seconds: u64) -> Result<Self, EncvError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(EncvError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }
        let lifetime = i64::try_from(lifetime_seconds)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::seconds)
            .ok_or_else(|| EncvError::Config("JWT_EXPIRY_SECONDS out of range".into()))?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    /// When a token issued at `now` stops being accepted
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.lifetime
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, EncvError> {
        let claims = SessionClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            strand: user.participant_strand,
            iat: now.timestamp(),
            exp: self.expires_at(now).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| EncvError::Auth(format!("Failed to sign session token: {e}")))
    }

    /// Check signature and expiry. Failures map to `Unauthorized` with a
    /// short reason.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, EncvError> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| {
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "Session expired",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Invalid token",
                };
                EncvError::Unauthorized(reason.into())
            })
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let (scheme, token) = auth_header?.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
