//! Namespaces: isolated routing domains with their own admission policy,
//! room table and event registry.

use crate::auth::{Authenticator, Handshake};
use crate::error::GatewayError;
use crate::events::{EventContext, EventRegistry};
use crate::frame::{EventFrame, CONNECTION_EVENT};
use crate::rooms::user_room;
use crate::session::{Connection, DisconnectReason};
use crate::transport::{Outbound, RoomTable, RoomTransport};
use crate::Result;
use courier_core::config::NamespaceConfig;
use courier_core::{expand_allowed_roles, ConnectionId, Identity, Role};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Admission and resource settings for one namespace.
#[derive(Debug, Clone)]
pub struct NamespaceOptions {
    /// Roles admitted. Identities without a role are always admitted.
    pub allowed_roles: Vec<Role>,

    /// Log admission decisions and relays at debug level.
    pub debug_logging: bool,

    /// Connection cap.
    pub max_connections: usize,
}

impl NamespaceOptions {
    /// Options admitting the given roles, with default limits.
    pub fn new(allowed_roles: Vec<Role>) -> Self {
        Self {
            allowed_roles,
            debug_logging: false,
            max_connections: 10_000,
        }
    }

    /// Build options from a namespace config section.
    pub fn from_config(
        config: &NamespaceConfig,
        max_connections: usize,
    ) -> std::result::Result<Self, courier_core::Error> {
        Ok(Self {
            allowed_roles: expand_allowed_roles(&config.allowed_roles)?,
            debug_logging: config.debug_logging,
            max_connections,
        })
    }

    /// Enable debug logging.
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Set the connection cap.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

/// One isolated routing domain.
pub struct Namespace {
    path: String,
    options: NamespaceOptions,
    authenticator: Arc<Authenticator>,
    rooms: Arc<RoomTable>,
    events: EventRegistry,
}

impl Namespace {
    fn new(path: String, options: NamespaceOptions, authenticator: Arc<Authenticator>) -> Self {
        Self {
            path,
            options,
            authenticator,
            rooms: Arc::new(RoomTable::new()),
            events: EventRegistry::new(),
        }
    }

    /// Route path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn options(&self) -> &NamespaceOptions {
        &self.options
    }

    /// Room table of this namespace.
    pub fn rooms(&self) -> &Arc<RoomTable> {
        &self.rooms
    }

    /// Event registry of this namespace.
    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.rooms.connection_count()
    }

    /// Authenticate a handshake and apply the admission policy.
    ///
    /// On rejection the connection never opens and nothing is left behind in
    /// the identity table.
    pub async fn handshake(
        &self,
        conn: &ConnectionId,
        handshake: &Handshake,
    ) -> Result<Option<Arc<Identity>>> {
        if self.connection_count() >= self.options.max_connections {
            warn!(namespace = %self.path, max = self.options.max_connections, "Connection cap reached");
            return Err(GatewayError::AtCapacity(self.path.clone()));
        }

        let identity = self.authenticator.authenticate(conn, handshake).await;
        if let Err(e) = self.admit(identity.as_deref()) {
            self.authenticator.release(conn);
            return Err(e);
        }
        Ok(identity)
    }

    /// Role check against the allow-list.
    pub fn admit(&self, identity: Option<&Identity>) -> Result<()> {
        let Some(identity) = identity else {
            self.log_admission("Admitting connection without identity", None);
            return Ok(());
        };
        let Some(role) = &identity.role else {
            self.log_admission("Admitting identity without role", Some(&identity.user_id));
            return Ok(());
        };

        if self.options.allowed_roles.contains(role) {
            self.log_admission("Admitted", Some(&identity.user_id));
            Ok(())
        } else {
            warn!(
                namespace = %self.path,
                user = %identity.user_id,
                role = %role,
                "Rejected handshake: role not allowed"
            );
            Err(GatewayError::Forbidden {
                role: role.to_string(),
                namespace: self.path.clone(),
            })
        }
    }

    fn log_admission(&self, message: &str, user: Option<&str>) {
        if self.options.debug_logging {
            debug!(namespace = %self.path, user = user.unwrap_or("-"), "{}", message);
        } else {
            trace!(namespace = %self.path, user = user.unwrap_or("-"), "{}", message);
        }
    }

    /// Attach an admitted socket: register its queue, join its direct room and
    /// send the `connection` event.
    pub fn connect(&self, connection: &Connection, outbound: Outbound) {
        self.rooms.attach(connection.id.clone(), outbound);

        if let Some(user_id) = connection.user_id() {
            self.rooms.join(&connection.id, &user_room(user_id));
        }

        match EventFrame::from_payload(CONNECTION_EVENT, &connection.hello()) {
            Ok(frame) => {
                self.rooms.emit(&connection.id, frame);
            }
            Err(e) => warn!(conn = %connection.id, error = %e, "Failed to build connection event"),
        }

        info!(
            namespace = %self.path,
            conn = %connection.id,
            user = connection.user_id().unwrap_or("-"),
            "Client connected"
        );
    }

    /// Handle one inbound text message.
    ///
    /// Malformed frames, unknown events and handler errors are answered with an
    /// `error` frame to the sender only.
    pub async fn dispatch(&self, conn: &ConnectionId, text: &str) {
        let frame = match EventFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(namespace = %self.path, conn = %conn, error = %e, "Malformed frame");
                self.rooms.emit(conn, EventFrame::error(None, &e));
                return;
            }
        };

        let identity = self.authenticator.identity(conn);
        let ctx = EventContext {
            connection: conn,
            identity: identity.as_deref(),
            namespace: &self.path,
            rooms: self.rooms.as_ref(),
            debug: self.options.debug_logging,
        };

        if let Err(e) = self.events.dispatch(&ctx, &frame.event, frame.data).await {
            match &e {
                GatewayError::UnknownEvent(_) => {
                    warn!(namespace = %self.path, conn = %conn, event = %frame.event, "Unknown event")
                }
                _ => debug!(namespace = %self.path, conn = %conn, event = %frame.event, error = %e, "Event failed"),
            }
            self.rooms.emit(conn, EventFrame::error(Some(&frame.event), &e));
        }
    }

    /// Tear down a connection, releasing its rooms and identity.
    pub fn disconnect(&self, connection: &Connection, reason: DisconnectReason) {
        let released = self.rooms.detach(&connection.id);
        self.authenticator.release(&connection.id);
        info!(
            namespace = %self.path,
            conn = %connection.id,
            user = connection.user_id().unwrap_or("-"),
            reason = %reason,
            rooms = released.len(),
            duration_secs = connection.age_secs(),
            "Client disconnected"
        );
    }

    /// Release an identity for a handshake whose upgrade never completed.
    pub fn abandon(&self, conn: &ConnectionId) {
        self.authenticator.release(conn);
    }
}

/// All namespaces served by one gateway.
pub struct NamespaceRegistry {
    authenticator: Arc<Authenticator>,
    namespaces: Vec<Arc<Namespace>>,
}

impl NamespaceRegistry {
    /// Create an empty registry sharing one authenticator.
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            authenticator,
            namespaces: Vec::new(),
        }
    }

    /// Create a namespace at `path`.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        options: NamespaceOptions,
    ) -> Result<Arc<Namespace>> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(GatewayError::Config(format!(
                "namespace path '{}' must start with '/'",
                path
            )));
        }
        if self.get(&path).is_some() {
            return Err(GatewayError::Config(format!(
                "namespace path '{}' is already registered",
                path
            )));
        }

        let roles: Vec<&str> = options.allowed_roles.iter().map(Role::as_str).collect();
        info!(namespace = %path, roles = ?roles, "Registered namespace");

        let namespace = Arc::new(Namespace::new(path, options, self.authenticator.clone()));
        self.namespaces.push(namespace.clone());
        Ok(namespace)
    }

    /// Look up a namespace by path.
    pub fn get(&self, path: &str) -> Option<&Arc<Namespace>> {
        self.namespaces.iter().find(|ns| ns.path() == path)
    }

    /// Iterate over namespaces in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Namespace>> {
        self.namespaces.iter()
    }

    /// Connection count per namespace path.
    pub fn connection_counts(&self) -> BTreeMap<String, usize> {
        self.namespaces
            .iter()
            .map(|ns| (ns.path().to_string(), ns.connection_count()))
            .collect()
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}
