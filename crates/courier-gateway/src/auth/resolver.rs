//! Bearer token verification.

use crate::error::AuthError;
use async_trait::async_trait;
use courier_core::config::AuthConfig;
use courier_core::SecretString;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Claims carried by a Courier bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User ID.
    pub sub: String,

    /// Role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Issued-at (Unix timestamp).
    #[serde(default)]
    pub iat: i64,

    /// Expiry (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Create claims for a user and role, valid for `ttl` from now.
    pub fn new(sub: impl Into<String>, role: impl Into<String>, ttl: chrono::Duration) -> Self {
        let now = chrono::Utc::now();
        Self {
            sub: sub.into(),
            role: Some(role.into()),
            email: None,
            name: None,
            full_name: None,
            avatar: None,
            iss: None,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Set the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }
}

/// A token that passed verification.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Subject user ID.
    pub user_id: String,

    /// Decoded claims.
    pub claims: Claims,
}

/// Verifies bearer tokens presented at handshake.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Verify and decode a token.
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

/// HS256 verification with a shared secret.
pub struct JwtResolver {
    key: DecodingKey,
    validation: Validation,
}

impl JwtResolver {
    /// Create a resolver for a secret, with optional issuer check.
    pub fn new(secret: &SecretString, issuer: Option<&str>, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            key: DecodingKey::from_secret(secret.expose_bytes()),
            validation,
        }
    }

    /// Build the resolver described by the auth config.
    ///
    /// Without a usable secret every token is rejected.
    pub fn from_config(config: &AuthConfig) -> Arc<dyn IdentityResolver> {
        match &config.jwt_secret {
            Some(secret) if !secret.is_empty() => Arc::new(Self::new(
                secret,
                config.issuer.as_deref(),
                config.leeway_secs,
            )),
            _ => {
                debug!("No JWT secret configured, bearer tokens will be rejected");
                Arc::new(DisabledResolver)
            }
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtResolver {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?;
        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }
        Ok(VerifiedToken {
            user_id: claims.sub.clone(),
            claims,
        })
    }
}

/// Rejects every token.
pub struct DisabledResolver;

#[async_trait]
impl IdentityResolver for DisabledResolver {
    async fn verify(&self, _token: &str) -> Result<VerifiedToken, AuthError> {
        Err(AuthError::MissingSecret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};

    fn sign(claims: &Claims, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_verify_valid_token() {
        let resolver = JwtResolver::new(&SecretString::new("s3cret"), None, 30);
        let token = sign(&Claims::new("u1", "user", chrono::Duration::hours(1)), "s3cret");

        let verified = resolver.verify(&token).await.unwrap();
        assert_eq!(verified.user_id, "u1");
        assert_eq!(verified.claims.role.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_secret() {
        let resolver = JwtResolver::new(&SecretString::new("s3cret"), None, 30);
        let token = sign(&Claims::new("u1", "user", chrono::Duration::hours(1)), "other");
        assert!(matches!(
            resolver.verify(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_expired() {
        let resolver = JwtResolver::new(&SecretString::new("s3cret"), None, 30);
        let token = sign(&Claims::new("u1", "user", chrono::Duration::hours(-2)), "s3cret");
        assert!(resolver.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_checks_issuer() {
        let resolver = JwtResolver::new(&SecretString::new("s3cret"), Some("courier"), 30);
        let good = sign(
            &Claims::new("u1", "user", chrono::Duration::hours(1)).with_issuer("courier"),
            "s3cret",
        );
        let bad = sign(
            &Claims::new("u1", "user", chrono::Duration::hours(1)).with_issuer("elsewhere"),
            "s3cret",
        );
        assert!(resolver.verify(&good).await.is_ok());
        assert!(resolver.verify(&bad).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let resolver = JwtResolver::new(&SecretString::new("s3cret"), None, 30);
        assert!(resolver.verify("not-a-jwt").await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_resolver_rejects_everything() {
        let resolver = JwtResolver::from_config(&AuthConfig::default());
        let token = sign(&Claims::new("u1", "user", chrono::Duration::hours(1)), "s3cret");
        assert!(matches!(
            resolver.verify(&token).await,
            Err(AuthError::MissingSecret)
        ));
    }
}
