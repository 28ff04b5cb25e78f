//! User projection for verified tokens.

use super::resolver::VerifiedToken;
use crate::error::AuthError;
use async_trait::async_trait;
use courier_core::config::DirectoryConfig;
use courier_core::{Identity, Role};
use std::collections::HashMap;
use std::sync::Arc;

/// Minimal user record attached to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub role: Role,
    pub email: Option<String>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Create a profile with only the required fields.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            email: None,
            name: None,
            full_name: None,
            avatar: None,
        }
    }

    /// Turn the profile into a connection identity.
    pub fn into_identity(self) -> Identity {
        Identity {
            user_id: self.user_id,
            role: Some(self.role),
            email: self.email,
            name: self.name,
            full_name: self.full_name,
            avatar: self.avatar,
        }
    }
}

/// Looks up the user behind a verified token.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Project a verified token into a profile. `None` means the user is unknown.
    async fn project(&self, token: &VerifiedToken) -> Result<Option<UserProfile>, AuthError>;
}

/// Directory seeded from the config file.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: HashMap<String, UserProfile>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from config entries.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, courier_core::Error> {
        let mut directory = Self::new();
        for user in &config.users {
            directory.insert(UserProfile {
                user_id: user.id.clone(),
                role: Role::new(&user.role)?,
                email: user.email.clone(),
                name: user.name.clone(),
                full_name: user.full_name.clone(),
                avatar: user.avatar.clone(),
            });
        }
        Ok(directory)
    }

    /// Add or replace a user.
    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.user_id.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn project(&self, token: &VerifiedToken) -> Result<Option<UserProfile>, AuthError> {
        Ok(self.users.get(&token.user_id).cloned())
    }
}

/// Projects the profile straight from the token claims.
pub struct ClaimsDirectory;

#[async_trait]
impl UserDirectory for ClaimsDirectory {
    async fn project(&self, token: &VerifiedToken) -> Result<Option<UserProfile>, AuthError> {
        let claims = &token.claims;
        let role = claims
            .role
            .as_deref()
            .ok_or_else(|| AuthError::InvalidToken("missing role claim".to_string()))?;
        let role = Role::new(role).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(Some(UserProfile {
            user_id: token.user_id.clone(),
            role,
            email: claims.email.clone(),
            name: claims.name.clone(),
            full_name: claims.full_name.clone(),
            avatar: claims.avatar.clone(),
        }))
    }
}

/// Pick the directory for a config: the static list when users are
/// configured, token claims otherwise.
pub fn directory_from_config(
    config: &DirectoryConfig,
) -> Result<Arc<dyn UserDirectory>, courier_core::Error> {
    if config.users.is_empty() {
        Ok(Arc::new(ClaimsDirectory))
    } else {
        Ok(Arc::new(MemoryDirectory::from_config(config)?))
    }
}
