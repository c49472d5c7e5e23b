use std::sync::Arc;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT payload for a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: i64,    // issued at (unix timestamp)
    pub exp: i64,    // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Why a token was rejected. Callers tell `Expired` apart to ask for a re-login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

/// Signs and checks tokens. Implementations verify structure and signature
/// only; expiry is judged by [`TokenService`] against its own clock.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, claims: &Claims) -> anyhow::Result<String>;
    fn decode(&self, token: &str) -> Result<Claims, TokenError>;
}

/// HS256 JWTs bound to one issuer and audience.
pub struct HmacSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl HmacSigner {
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenSigner for HmacSigner {
    fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

/// A token that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: Uuid,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Issues and verifies session tokens through a pluggable [`TokenSigner`].
#[derive(Clone)]
pub struct TokenService {
    signer: Arc<dyn TokenSigner>,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(signer: Arc<dyn TokenSigner>, issuer: &str, audience: &str, ttl: Duration) -> Self {
        Self {
            signer,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        let signer = HmacSigner::new(cfg.secret.as_bytes(), &cfg.issuer, &cfg.audience);
        Self::new(
            Arc::new(signer),
            &cfg.issuer,
            &cfg.audience,
            Duration::minutes(cfg.ttl_minutes),
        )
    }

    /// Token for `subject` with the configured session lifetime.
    pub fn issue_session(&self, subject: Uuid) -> anyhow::Result<String> {
        self.issue(subject, self.ttl)
    }

    pub fn issue(&self, subject: Uuid, ttl: Duration) -> anyhow::Result<String> {
        self.issue_at(subject, ttl, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        subject: Uuid,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let claims = Claims {
            sub: subject,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = self.signer.sign(&claims)?;
        debug!(user_id = %subject, exp = claims.exp, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Expired once `now` reaches `exp`; there is no leeway.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<VerifiedToken, TokenError> {
        let claims = self.signer.decode(token)?;
        let issued_at =
            OffsetDateTime::from_unix_timestamp(claims.iat).map_err(|_| TokenError::Malformed)?;
        let expires_at =
            OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|_| TokenError::Malformed)?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }
        Ok(VerifiedToken {
            subject: claims.sub,
            issued_at,
            expires_at,
        })
    }
}
