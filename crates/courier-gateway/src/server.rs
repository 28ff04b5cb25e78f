//! WebSocket gateway server.

use crate::auth::{Authenticator, Handshake};
use crate::error::GatewayError;
use crate::frame::EventFrame;
use crate::handlers::{CallSignaling, ChatChannel, NotificationChannel, NotificationPublisher, RoomControl};
use crate::namespace::{Namespace, NamespaceOptions, NamespaceRegistry};
use crate::rooms::ChatKind;
use crate::session::{Connection, DisconnectReason};
use crate::store::{MemoryNotificationStore, NotificationStore};
use crate::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use courier_core::config::{BindMode, GatewayConfig, NamespaceConfig};
use courier_core::{Config, ConnectionId};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// How long a closing socket may take to flush its queue.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// External services the gateway depends on.
pub struct GatewayServices {
    /// Handshake authenticator.
    pub authenticator: Arc<Authenticator>,

    /// Notification persistence.
    pub store: Arc<dyn NotificationStore>,
}

impl GatewayServices {
    /// Services described by the config, with an in-memory notification store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let authenticator =
            Authenticator::from_config(config).map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(Self {
            authenticator: Arc::new(authenticator),
            store: Arc::new(MemoryNotificationStore::new()),
        })
    }
}

/// Per-route state handed to the upgrade handler.
#[derive(Clone)]
struct NamespaceState {
    namespace: Arc<Namespace>,
    outbound_buffer: usize,
    shutdown: watch::Receiver<bool>,
}

/// The WebSocket gateway server.
pub struct Gateway {
    config: GatewayConfig,
    namespaces: Arc<NamespaceRegistry>,
    notifier: Option<NotificationPublisher>,
    shutdown: watch::Sender<bool>,
}

impl Gateway {
    /// Create a gateway from config with default services.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_services(config, GatewayServices::from_config(config)?)
    }

    /// Create a gateway from config and explicit services.
    ///
    /// Registers every enabled namespace and its channels.
    pub fn with_services(config: &Config, services: GatewayServices) -> Result<Self> {
        let mut registry = NamespaceRegistry::new(services.authenticator.clone());
        let max_connections = config.gateway.max_connections;
        let mut notifier = None;

        let ns = &config.namespaces;
        if ns.notifications.enabled {
            let namespace = register(&mut registry, &ns.notifications, max_connections)?;
            NotificationChannel::new(services.store.clone()).register(namespace.events());
            notifier = Some(NotificationPublisher::new(
                namespace.rooms().clone(),
                services.store.clone(),
            ));
        }

        let call_ttl = Duration::from_secs(config.calls.session_ttl_secs);
        for (kind, ns_config) in [
            (ChatKind::Admin, &ns.admin_chat),
            (ChatKind::Shop, &ns.shop_chat),
            (ChatKind::Ai, &ns.ai_chat),
        ] {
            if !ns_config.enabled {
                continue;
            }
            let namespace = register(&mut registry, ns_config, max_connections)?;
            ChatChannel::new(kind).register(namespace.events());
            if ns_config.call_signaling {
                CallSignaling::new(call_ttl).register(namespace.events());
            }
        }

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            config: config.gateway.clone(),
            namespaces: Arc::new(registry),
            notifier,
            shutdown,
        })
    }

    /// Registered namespaces.
    pub fn namespaces(&self) -> &Arc<NamespaceRegistry> {
        &self.namespaces
    }

    /// Push handle for the notification namespace, if it is enabled.
    pub fn notifier(&self) -> Option<&NotificationPublisher> {
        self.notifier.as_ref()
    }

    /// Run the gateway on the configured address until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let addr = self.bind_address();

        if self.config.bind != BindMode::Loopback {
            warn!("========================================");
            warn!("  Gateway binding to {}", addr);
            warn!("  Namespaces are reachable from the network.");
            warn!("========================================");
        }

        let listener = TcpListener::bind(addr).await.map_err(GatewayError::Io)?;

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.send_replace(true);
            }
        });

        self.serve(listener).await
    }

    /// Serve on an already bound listener until [`Gateway::shutdown`] is called.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().map_err(GatewayError::Io)?;
        let app = self.create_router();

        for ns in self.namespaces.iter() {
            info!(namespace = %ns.path(), "Serving namespace on ws://{}{}", addr, ns.path());
        }
        info!("Starting gateway server on {}", addr);

        let mut shutdown = self.shutdown.subscribe();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Stop accepting connections and close every open socket.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Create the Axum router.
    pub fn create_router(&self) -> Router {
        let mut router = Router::new();
        for namespace in self.namespaces.iter() {
            let state = NamespaceState {
                namespace: namespace.clone(),
                outbound_buffer: self.config.outbound_buffer,
                shutdown: self.shutdown.subscribe(),
            };
            router = router.route(namespace.path(), get(ws_handler).with_state(state));
        }

        let mut router = router
            .route("/health", get(health_handler).with_state(self.namespaces.clone()))
            .layer(TraceLayer::new_for_http());

        if self.config.cors {
            router = router.layer(Self::create_cors_layer(&self.config));
        }

        router
    }

    /// CORS restricted to the configured origins.
    fn create_cors_layer(config: &GatewayConfig) -> CorsLayer {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .max_age(Duration::from_secs(3600))
    }

    /// Get the bind address.
    pub fn bind_address(&self) -> SocketAddr {
        let ip = match self.config.bind {
            BindMode::Loopback => [127, 0, 0, 1],
            BindMode::Lan => [0, 0, 0, 0],
        };
        SocketAddr::from((ip, self.config.port))
    }
}

fn register(
    registry: &mut NamespaceRegistry,
    config: &NamespaceConfig,
    max_connections: usize,
) -> Result<Arc<Namespace>> {
    let options = NamespaceOptions::from_config(config, max_connections)
        .map_err(|e| GatewayError::Config(format!("{}: {}", config.path, e)))?
        .with_debug_logging(config.debug_logging);
    let namespace = registry.register(config.path.clone(), options)?;
    RoomControl::register(namespace.events());
    Ok(namespace)
}

/// Upgrade handler: authenticate, apply admission, then open the socket.
async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<NamespaceState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let conn = ConnectionId::generate();
    let handshake = Handshake::from_request(&headers, &query);

    let identity = match state.namespace.handshake(&conn, &handshake).await {
        Ok(identity) => identity,
        Err(e) => {
            let status = match e {
                GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
                GatewayError::AtCapacity(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return (status, e.to_string()).into_response();
        }
    };

    let mut connection = Connection::new(conn.clone(), state.namespace.path(), identity);
    if let Some(ConnectInfo(addr)) = connect_info {
        connection = connection.with_remote_addr(addr);
    }

    let abandoned = state.namespace.clone();
    ws.on_failed_upgrade(move |e| {
        warn!(conn = %conn, error = %e, "WebSocket upgrade failed");
        abandoned.abandon(&conn);
    })
    .on_upgrade(move |socket| handle_socket(socket, state, connection))
}

/// Drive one admitted socket until it closes.
async fn handle_socket(socket: WebSocket, state: NamespaceState, connection: Connection) {
    let namespace = state.namespace;
    let (tx, mut rx) = mpsc::channel::<Arc<EventFrame>>(state.outbound_buffer);
    let (mut sender, mut receiver) = socket.split();

    namespace.connect(&connection, tx);

    let conn_id = connection.id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(frame.to_text())).await {
                error!(conn = %conn_id, "Failed to send frame: {}", e);
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut shutdown = state.shutdown;
    let mut writer_done = false;
    let reason = if *shutdown.borrow() {
        DisconnectReason::ServerShutdown
    } else {
        loop {
            tokio::select! {
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        namespace.dispatch(&connection.id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break DisconnectReason::ClientClose,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn = %connection.id, "WebSocket error: {}", e);
                        break DisconnectReason::TransportError;
                    }
                },
                _ = shutdown.changed() => break DisconnectReason::ServerShutdown,
                _ = &mut writer => {
                    writer_done = true;
                    break DisconnectReason::TransportError;
                }
            }
        }
    };

    // Detaching drops the last queue sender, which lets the writer finish.
    namespace.disconnect(&connection, reason);

    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        debug!(conn = %connection.id, "Writer did not drain in time");
        writer.abort();
    }
}

/// Health check handler.
async fn health_handler(State(namespaces): State<Arc<NamespaceRegistry>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "namespaces": namespaces.connection_counts(),
    }))
}
