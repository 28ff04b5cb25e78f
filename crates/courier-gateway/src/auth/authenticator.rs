//! Per-connection identity derivation.

use super::directory::{directory_from_config, UserDirectory};
use super::resolver::{IdentityResolver, JwtResolver};
use super::Handshake;
use crate::error::AuthError;
use courier_core::config::AuthConfig;
use courier_core::{Config, ConnectionId, Identity};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Derives an identity for each handshake and keeps it for the life of the
/// connection.
///
/// Authentication never blocks a handshake: every failure is logged and the
/// connection continues without an identity. Admission is decided later by
/// the namespace.
pub struct Authenticator {
    resolver: Arc<dyn IdentityResolver>,
    directory: Arc<dyn UserDirectory>,
    allow_anonymous: bool,
    identities: DashMap<ConnectionId, Arc<Identity>>,
}

impl Authenticator {
    /// Create an authenticator from its two upstream services.
    pub fn new(resolver: Arc<dyn IdentityResolver>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            resolver,
            directory,
            allow_anonymous: true,
            identities: DashMap::new(),
        }
    }

    /// Accept or ignore tokenless `userId` handshakes.
    pub fn with_anonymous(mut self, allow: bool) -> Self {
        self.allow_anonymous = allow;
        self
    }

    /// Build the authenticator described by the config.
    pub fn from_config(config: &Config) -> Result<Self, courier_core::Error> {
        Ok(Self::from_parts(&config.auth, directory_from_config(&config.directory)?))
    }

    fn from_parts(auth: &AuthConfig, directory: Arc<dyn UserDirectory>) -> Self {
        Self::new(JwtResolver::from_config(auth), directory).with_anonymous(auth.allow_anonymous)
    }

    /// Derive and record the identity for a new connection.
    pub async fn authenticate(
        &self,
        conn: &ConnectionId,
        handshake: &Handshake,
    ) -> Option<Arc<Identity>> {
        let identity = match (&handshake.bearer, &handshake.anonymous_user_id) {
            (Some(token), _) => match self.resolve(token).await {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(conn = %conn, error = %e, "Token verification failed, continuing unauthenticated");
                    None
                }
            },
            (None, Some(user_id)) if self.allow_anonymous => {
                debug!(conn = %conn, user = %user_id, "Accepting anonymous user id");
                Some(Identity::anonymous(user_id.clone()))
            }
            (None, Some(user_id)) => {
                debug!(conn = %conn, user = %user_id, "Anonymous user ids are disabled, ignoring");
                None
            }
            (None, None) => None,
        };

        let identity = identity.map(Arc::new);
        if let Some(identity) = &identity {
            self.identities.insert(conn.clone(), identity.clone());
        }
        identity
    }

    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let verified = self.resolver.verify(token).await?;
        let profile = self
            .directory
            .project(&verified)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(verified.user_id.clone()))?;
        Ok(profile.into_identity())
    }

    /// Identity attached to a connection.
    pub fn identity(&self, conn: &ConnectionId) -> Option<Arc<Identity>> {
        self.identities.get(conn).map(|entry| entry.value().clone())
    }

    /// Forget a connection's identity.
    pub fn release(&self, conn: &ConnectionId) {
        self.identities.remove(conn);
    }

    /// Number of connections with an attached identity.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
