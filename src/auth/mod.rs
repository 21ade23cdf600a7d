//! Token-based authentication.
//!
//! A single password is exchanged for an access/refresh token pair (HS256
//! JWTs). Every `/api` route requires the access token as a bearer token.
//! Secrets are compared in constant time to mitigate timing attacks.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, AppResult};

const SUBJECT: &str = "lifelog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
}

/// Access/refresh token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Issues and verifies tokens.
#[derive(Clone)]
pub struct Authenticator {
    password: Option<String>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Authenticator {
    /// `password: None` disables login entirely.
    pub fn new(
        password: Option<String>,
        secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            password,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// A secret that only lives as long as this process.
    pub fn random_secret() -> String {
        format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        )
    }

    /// Exchange the password for a token pair.
    pub fn login(&self, password: &str) -> AppResult<TokenPair> {
        let Some(expected) = self.password.as_deref() else {
            return Err(AppError::Unauthorized(
                "Login is disabled on this server".to_string(),
            ));
        };
        if !constant_time_compare(password, expected) {
            tracing::warn!("Rejected login attempt");
            return Err(AppError::Unauthorized("Invalid password".to_string()));
        }
        self.issue_pair()
    }

    /// Exchange a valid refresh token for a fresh pair.
    pub fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue_pair()
    }

    /// Check an access token presented on an API request.
    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenKind::Access)
    }

    fn verify(&self, token: &str, kind: TokenKind) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {e}")))?;
        if data.claims.kind != kind {
            return Err(AppError::Unauthorized("Wrong token kind".to_string()));
        }
        Ok(data.claims)
    }

    fn issue_pair(&self) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, self.access_ttl)?,
            refresh_token: self.issue(TokenKind::Refresh, self.refresh_ttl)?,
        })
    }

    fn issue(&self, kind: TokenKind, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("Token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: SUBJECT.to_string(),
            kind,
            iat: now.timestamp().max(0) as usize,
            exp: expires.timestamp().max(0) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }
}

/// Bearer-token middleware guarding the API routes.
pub async fn bearer_auth_layer(auth: Arc<Authenticator>, request: Request, next: Next) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    match bearer {
        Some(token) => match auth.verify_access(&token) {
            Ok(_) => next.run(request).await,
            Err(e) => e.into_response(),
        },
        None => AppError::Unauthorized("Missing bearer token".to_string()).into_response(),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(
            Some("mytestpass".to_string()),
            "test-secret",
            Duration::minutes(15),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_login_and_verify() {
        let auth = authenticator();
        let pair = auth.login("mytestpass").unwrap();

        let claims = auth.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.sub, SUBJECT);
    }

    #[test]
    fn test_wrong_password() {
        let err = authenticator().login("nope").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_login_disabled_without_password() {
        let auth = Authenticator::new(None, "s", Duration::minutes(1), Duration::minutes(1));
        assert!(matches!(auth.login(""), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_token_kinds_not_interchangeable() {
        let auth = authenticator();
        let pair = auth.login("mytestpass").unwrap();

        assert!(auth.verify_access(&pair.refresh_token).is_err());
        assert!(auth.refresh(&pair.access_token).is_err());

        let renewed = auth.refresh(&pair.refresh_token).unwrap();
        assert!(auth.verify_access(&renewed.access_token).is_ok());
    }

    #[test]
    fn test_expired_and_foreign_tokens_rejected() {
        let expired = Authenticator::new(
            Some("p".to_string()),
            "test-secret",
            Duration::minutes(-10),
            Duration::minutes(-10),
        );
        let pair = expired.login("p").unwrap();
        assert!(authenticator().verify_access(&pair.access_token).is_err());

        let other = Authenticator::new(
            Some("p".to_string()),
            "other-secret",
            Duration::minutes(5),
            Duration::minutes(5),
        );
        let pair = other.login("p").unwrap();
        assert!(authenticator().verify_access(&pair.access_token).is_err());
    }

    #[test]
    fn test_random_secret() {
        let a = Authenticator::random_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, Authenticator::random_secret());
    }

    #[test]
    fn test_unrepresentable_lifetime_is_an_error() {
        let auth = Authenticator::new(
            Some("p".to_string()),
            "test-secret",
            Duration::MAX,
            Duration::hours(1),
        );
        assert!(matches!(auth.login("p"), Err(AppError::Internal(_))));
    }
}
