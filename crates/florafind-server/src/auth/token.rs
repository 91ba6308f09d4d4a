//! Signed bearer tokens (compact JWS, HMAC family).
//!
//! Tokens carry the username in `sub`, a unix-seconds `exp`, and a `type`
//! claim so an access token can never be replayed as a refresh or
//! password-reset token.

use crate::config::AuthConfig;
use crate::secret::SecretString;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Supported signing algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    HS256,
    HS384,
    HS512,
}

impl JwtAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            JwtAlgorithm::HS256 => "HS256",
            JwtAlgorithm::HS384 => "HS384",
            JwtAlgorithm::HS512 => "HS512",
        }
    }

    fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, TokenError> {
        fn mac<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TokenError> {
            let mut mac = <M as Mac>::new_from_slice(key)
                .map_err(|e| TokenError::Signing(e.to_string()))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }

        match self {
            JwtAlgorithm::HS256 => mac::<Hmac<Sha256>>(key, data),
            JwtAlgorithm::HS384 => mac::<Hmac<Sha384>>(key, data),
            JwtAlgorithm::HS512 => mac::<Hmac<Sha512>>(key, data),
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JwtAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(JwtAlgorithm::HS256),
            "HS384" => Ok(JwtAlgorithm::HS384),
            "HS512" => Ok(JwtAlgorithm::HS512),
            other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Purpose of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    PasswordReset,
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

#[derive(Debug, Serialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

#[derive(Debug, Deserialize)]
struct DecodedHeader {
    alg: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: expected a {expected:?} token")]
    WrongKind { expected: TokenKind },

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Access/refresh pair returned by the login and refresh endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
}

/// Issues and verifies tokens with a single shared key
pub struct TokenService {
    key: SecretString,
    algorithm: JwtAlgorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: config.secret_key.clone(),
            algorithm: config.algorithm,
            access_ttl: Duration::try_minutes(config.access_token_expire_minutes)
                .unwrap_or(Duration::MAX),
            refresh_ttl: Duration::try_days(config.refresh_token_expire_days)
                .unwrap_or(Duration::MAX),
            reset_ttl: Duration::try_minutes(config.password_reset_token_expire_minutes)
                .unwrap_or(Duration::MAX),
        }
    }

    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::PasswordReset => self.reset_ttl,
        }
    }

    /// Issue a token of the given kind with its configured lifetime
    pub fn issue(&self, subject: &str, kind: TokenKind) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl(kind)).ok_or_else(|| {
            TokenError::Signing(format!("{:?} token lifetime overflows the clock", kind))
        })?;
        self.issue_at(subject, kind, now, expires_at)
    }

    /// Issue a token with explicit timestamps
    pub fn issue_at(
        &self,
        subject: &str,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let header = Header {
            alg: self.algorithm.as_str(),
            typ: "JWT",
        };
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            kind,
        };

        let header_json =
            serde_json::to_vec(&header).map_err(|e| TokenError::Signing(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| TokenError::Signing(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self
            .algorithm
            .sign(self.key.expose().as_bytes(), signing_input.as_bytes())?;

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(subject, TokenKind::Access)?,
            token_type: "bearer".to_string(),
            refresh_token: self.issue(subject, TokenKind::Refresh)?,
        })
    }

    /// Check signature, algorithm and expiry; return the claims
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(TokenError::Invalid),
            };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Invalid)?;
        let header: DecodedHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Invalid)?;
        if header.alg != self.algorithm.as_str() {
            return Err(TokenError::Invalid);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Invalid)?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        let expected = self
            .algorithm
            .sign(self.key.expose().as_bytes(), signing_input.as_bytes())?;
        if !bool::from(expected.ct_eq(&signature)) {
            return Err(TokenError::Invalid);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| TokenError::Invalid)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Invalid)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.sub.is_empty() {
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }

    /// [`decode`](Self::decode) plus a check of the `type` claim
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(claims)
    }
}
