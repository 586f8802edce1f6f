//! ---
//! osscat_section: "06-security-access-control"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Credentials, bearer tokens, and role-based access control."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! HS256 bearer tokens carrying `{sub, username, roles, iat, exp}`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use osscat_common::config::AuthConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::User;
use crate::rbac::Role;

/// Verification and signing failures. Every variant means "not authenticated".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Current time is past the `exp` claim.
    #[error("token expired")]
    Expired,
    /// Signature does not validate against the server secret.
    #[error("token signature invalid")]
    InvalidSignature,
    /// Token structure or claims could not be decoded.
    #[error("token malformed")]
    Malformed,
    /// Encoding a new token failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Claims embedded in every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: String,
    /// Username at issue time.
    pub username: String,
    /// Roles at issue time.
    pub roles: Vec<Role>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expires-at, seconds since the epoch.
    pub exp: i64,
}

impl TokenClaims {
    /// Subject parsed as a user id.
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Compact encoded token.
    pub access_token: String,
    /// Seconds until expiry.
    pub expires_in: u64,
}

/// Signs and verifies bearer tokens with a server-held symmetric secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    /// Build from an explicit secret and lifetime. Immutable afterwards.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked against the caller-supplied clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Build from the `[auth]` configuration section.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.token_secret.as_bytes(), config.token_ttl)
    }

    /// Configured token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user`, valid from now.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let ttl = self.ttl.as_secs();
        let claims = TokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            roles: user.roles.to_vec(),
            iat,
            exp: iat.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX)),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))?;
        Ok(IssuedToken {
            access_token: token,
            expires_in: ttl,
        })
    }

    /// Verify a token against the wall clock.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`. No skew allowance.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;
        if now.timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}
