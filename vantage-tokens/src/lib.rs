#![deny(clippy::print_stdout, clippy::print_stderr)]

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

mod revocation;

pub use revocation::InMemoryRevocationStore;

pub type CompanyId = String;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token service misconfigured: {0}")]
    Init(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub company_id: CompanyId,
    pub iat: i64,
    pub exp: i64,
}

/// Ephemeral revocation set keyed by the raw token string, with a TTL equal
/// to the token's remaining validity. A store outage must never block
/// logout or fail reads closed — callers of `is_revoked` treat an error as
/// "not revoked".
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(&self, token: &str, remaining_ttl: Duration) -> Result<(), TokenError>;

    async fn is_revoked(&self, token: &str) -> Result<bool, TokenError>;
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    revocation: std::sync::Arc<dyn RevocationStore>,
}

impl TokenService {
    /// `secret` must decode from base64 to at least 32 bytes (256 bits); a
    /// shorter key is a fatal initialization error, never a runtime one.
    pub fn new(
        secret_base64: &str,
        ttl: Duration,
        revocation: std::sync::Arc<dyn RevocationStore>,
    ) -> Result<Self, TokenError> {
        use base64::Engine;
        let key_bytes = base64::engine::general_purpose::STANDARD
            .decode(secret_base64)
            .map_err(|err| TokenError::Init(format!("secret is not valid base64: {err}")))?;
        if key_bytes.len() < 32 {
            return Err(TokenError::Init(
                "signing secret must be at least 32 bytes".into(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&key_bytes),
            decoding_key: DecodingKey::from_secret(&key_bytes),
            ttl,
            revocation,
        })
    }

    pub fn issue(&self, email: &str, company_id: &CompanyId) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            company_id: company_id.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Malformed)
    }

    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        match jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                jsonwebtoken::errors::ErrorKind::InvalidSignature => Err(TokenError::BadSignature),
                _ => Err(TokenError::Malformed),
            },
        }
    }

    pub async fn is_valid_for(&self, token: &str, expected_email: &str) -> bool {
        match self.parse(token) {
            Ok(claims) => claims.sub.eq_ignore_ascii_case(expected_email),
            Err(_) => false,
        }
    }

    /// Best-effort: a malformed token silently "succeeds" (there is nothing
    /// left to revoke) and a revocation-store failure is swallowed so logout
    /// never fails on it.
    pub async fn revoke(&self, token: &str) {
        let Ok(claims) = self.parse(token) else {
            return;
        };
        let remaining = DateTime::from_timestamp(claims.exp, 0)
            .map(|expires_at| expires_at - Utc::now())
            .unwrap_or(Duration::zero());
        if remaining <= Duration::zero() {
            return;
        }
        let _ = self.revocation.revoke(token, remaining).await;
    }

    /// Fail-open: a revocation-store error reports "not revoked" so an
    /// outage there degrades availability, not rejects valid traffic.
    pub async fn is_revoked(&self, token: &str) -> bool {
        self.revocation.is_revoked(token).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn service() -> TokenService {
        let secret = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            [7u8; 32],
        );
        TokenService::new(&secret, Duration::hours(24), Arc::new(InMemoryRevocationStore::new()))
            .expect("valid secret initializes")
    }

    #[test]
    fn rejects_short_secret() {
        let short = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [1u8; 8]);
        let err = match TokenService::new(&short, Duration::hours(1), Arc::new(InMemoryRevocationStore::new())) {
            Ok(_) => panic!("expected short secret to be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, TokenError::Init(_)));
    }

    #[test]
    fn issue_then_parse_round_trips_claims() {
        let service = service();
        let token = service
            .issue("owner@example.com", &"company-1".to_string())
            .expect("issue succeeds");
        let claims = service.parse(&token).expect("parse succeeds");
        assert_eq!(claims.sub, "owner@example.com");
        assert_eq!(claims.company_id, "company-1");
    }

    #[test]
    fn parse_rejects_garbage_as_malformed() {
        let service = service();
        let err = service.parse("not-a-jwt").unwrap_err();
        assert!(matches!(err, TokenError::Malformed));
    }

    #[tokio::test]
    async fn is_valid_for_matches_case_insensitively() {
        let service = service();
        let token = service
            .issue("Owner@Example.com", &"company-1".to_string())
            .expect("issue succeeds");
        assert!(service.is_valid_for(&token, "owner@example.com").await);
        assert!(!service.is_valid_for(&token, "someone-else@example.com").await);
    }

    #[tokio::test]
    async fn revoke_marks_token_revoked() {
        let service = service();
        let token = service
            .issue("owner@example.com", &"company-1".to_string())
            .expect("issue succeeds");
        assert!(!service.is_revoked(&token).await);
        service.revoke(&token).await;
        assert!(service.is_revoked(&token).await);
    }

    #[tokio::test]
    async fn revoke_on_malformed_token_is_a_silent_no_op() {
        let service = service();
        service.revoke("not-a-jwt").await;
    }
}
