//! Configuration schema definitions.

use crate::secret::SecretString;
use crate::types::RoleGroup;
use serde::{Deserialize, Serialize};

/// Main Courier configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Handshake authentication.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Namespace layout and admission policy.
    #[serde(default)]
    pub namespaces: NamespacesConfig,

    /// Call signaling settings.
    #[serde(default)]
    pub calls: CallsConfig,

    /// Static user directory.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind mode.
    #[serde(default)]
    pub bind: BindMode,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Exact origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum concurrent connections per namespace.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Per-connection outbound queue depth.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: BindMode::default(),
            port: default_port(),
            cors: true,
            allowed_origins: default_allowed_origins(),
            max_connections: default_max_connections(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_port() -> u16 {
    4100
}

fn default_max_connections() -> usize {
    10_000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

/// Bind mode for the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to loopback only (127.0.0.1).
    #[default]
    Loopback,

    /// Bind to all interfaces.
    Lan,
}

impl std::str::FromStr for BindMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loopback" => Ok(Self::Loopback),
            "lan" => Ok(Self::Lan),
            other => Err(format!("Invalid bind mode: {}", other)),
        }
    }
}

/// Handshake authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens. Without it every token is
    /// rejected and connections proceed unauthenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<SecretString>,

    /// Expected `iss` claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Clock-skew tolerance for `exp`/`nbf`.
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,

    /// Accept an explicit `userId` from tokenless handshakes as a degraded identity.
    #[serde(default = "default_true")]
    pub allow_anonymous: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: None,
            leeway_secs: default_leeway(),
            allow_anonymous: true,
        }
    }
}

fn default_leeway() -> u64 {
    30
}

/// Namespace layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespacesConfig {
    /// System notifications.
    #[serde(default = "NamespaceConfig::notifications")]
    pub notifications: NamespaceConfig,

    /// Customer ↔ administrator chat.
    #[serde(default = "NamespaceConfig::admin_chat")]
    pub admin_chat: NamespaceConfig,

    /// Customer ↔ shop chat.
    #[serde(default = "NamespaceConfig::shop_chat")]
    pub shop_chat: NamespaceConfig,

    /// Customer ↔ AI assistant chat.
    #[serde(default = "NamespaceConfig::ai_chat")]
    pub ai_chat: NamespaceConfig,
}

impl Default for NamespacesConfig {
    fn default() -> Self {
        Self {
            notifications: NamespaceConfig::notifications(),
            admin_chat: NamespaceConfig::admin_chat(),
            shop_chat: NamespaceConfig::shop_chat(),
            ai_chat: NamespaceConfig::ai_chat(),
        }
    }
}

impl NamespacesConfig {
    /// Iterate over `(name, config)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &NamespaceConfig)> {
        [
            ("notifications", &self.notifications),
            ("admin_chat", &self.admin_chat),
            ("shop_chat", &self.shop_chat),
            ("ai_chat", &self.ai_chat),
        ]
        .into_iter()
    }
}

/// One namespace's routing and admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Serve this namespace.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Route path.
    pub path: String,

    /// Allowed roles; `@group` entries expand a [`RoleGroup`].
    pub allowed_roles: Vec<String>,

    /// Log admission decisions and relays at debug level.
    #[serde(default)]
    pub debug_logging: bool,

    /// Layer call signaling on this namespace (chat namespaces only).
    #[serde(default = "default_true")]
    pub call_signaling: bool,
}

impl NamespaceConfig {
    fn with_group(path: &str, group: RoleGroup) -> Self {
        Self {
            enabled: true,
            path: path.to_string(),
            allowed_roles: vec![format!("@{}", group.name())],
            debug_logging: false,
            call_signaling: true,
        }
    }

    /// Default notifications namespace.
    pub fn notifications() -> Self {
        Self {
            call_signaling: false,
            ..Self::with_group("/notifications", RoleGroup::Everyone)
        }
    }

    /// Default admin chat namespace.
    pub fn admin_chat() -> Self {
        Self::with_group("/chat/admin", RoleGroup::AdminChat)
    }

    /// Default shop chat namespace.
    pub fn shop_chat() -> Self {
        Self::with_group("/chat/shop", RoleGroup::ShopChat)
    }

    /// Default AI chat namespace.
    pub fn ai_chat() -> Self {
        Self::with_group("/chat/ai", RoleGroup::AiChat)
    }
}

/// Call signaling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsConfig {
    /// Age after which an unfinished call entry is forgotten.
    #[serde(default = "default_call_ttl")]
    pub session_ttl_secs: u64,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_call_ttl(),
        }
    }
}

fn default_call_ttl() -> u64 {
    3600
}

/// Static user directory used to project verified tokens into identities.
///
/// When empty, identities are projected straight from token claims.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Known users.
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
}

/// A user known to the static directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    /// User ID (matches the token `sub`).
    pub id: String,

    /// Role.
    pub role: String,

    /// Email.
    #[serde(default)]
    pub email: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Full name.
    #[serde(default)]
    pub full_name: Option<String>,

    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

fn default_true() -> bool {
    true
}
