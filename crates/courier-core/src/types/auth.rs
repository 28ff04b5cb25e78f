//! Identity and role types used for namespace admission.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authenticated (or degraded anonymous) user context attached to a connection.
///
/// Derived once during the handshake and immutable afterwards. A degraded
/// identity built from an explicit anonymous user id carries only `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User ID.
    pub user_id: String,

    /// Role (absent for degraded identities).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Short display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Identity {
    /// Create an identity with a role.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role: Some(role),
            email: None,
            name: None,
            full_name: None,
            avatar: None,
        }
    }

    /// Create a degraded identity from an explicit anonymous user id.
    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: None,
            email: None,
            name: None,
            full_name: None,
            avatar: None,
        }
    }

    /// Set the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this identity lacks a role.
    pub fn is_anonymous(&self) -> bool {
        self.role.is_none()
    }
}

/// Normalized role string (trimmed, lower-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    pub const USER: &'static str = "user";
    pub const SHOP: &'static str = "shop";
    pub const ADMIN: &'static str = "admin";
    pub const SUPER_ADMIN: &'static str = "super_admin";
    pub const AI: &'static str = "ai";

    /// Create a role, normalizing the input.
    pub fn new(role: impl AsRef<str>) -> Result<Self, Error> {
        let normalized = role.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(Error::InvalidRole(role.as_ref().to_string()));
        }
        Ok(Self(normalized))
    }

    /// Get the role as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// Fixed named allow-lists of roles used to gate namespace admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleGroup {
    /// Every end-user facing role.
    Everyone,

    /// Customers talking to platform administrators.
    AdminChat,

    /// Customers talking to shops.
    ShopChat,

    /// Customers talking to the AI assistant.
    AiChat,

    /// Platform staff only.
    Staff,
}

impl RoleGroup {
    /// Get all role groups.
    pub fn all() -> &'static [RoleGroup] {
        &[
            Self::Everyone,
            Self::AdminChat,
            Self::ShopChat,
            Self::AiChat,
            Self::Staff,
        ]
    }

    /// Config-facing name of the group.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::AdminChat => "admin_chat",
            Self::ShopChat => "shop_chat",
            Self::AiChat => "ai_chat",
            Self::Staff => "staff",
        }
    }

    /// Look up a group by its config-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|g| g.name() == name)
    }

    /// Role strings in this group.
    pub fn roles(&self) -> &'static [&'static str] {
        match self {
            Self::Everyone => &[Role::USER, Role::SHOP, Role::ADMIN, Role::SUPER_ADMIN],
            Self::AdminChat => &[Role::USER, Role::ADMIN, Role::SUPER_ADMIN],
            Self::ShopChat => &[Role::USER, Role::SHOP, Role::ADMIN, Role::SUPER_ADMIN],
            Self::AiChat => &[Role::USER, Role::AI, Role::ADMIN, Role::SUPER_ADMIN],
            Self::Staff => &[Role::ADMIN, Role::SUPER_ADMIN],
        }
    }

    /// Check whether a role belongs to this group.
    pub fn allows(&self, role: &Role) -> bool {
        self.roles().contains(&role.as_str())
    }

    /// Materialize the group as owned roles.
    pub fn to_roles(&self) -> Vec<Role> {
        self.roles().iter().map(|r| Role(r.to_string())).collect()
    }
}

/// Expand a config allow-list into concrete roles.
///
/// Entries prefixed with `@` name a [`RoleGroup`] (`"@shop_chat"`); every
/// other entry is a literal role.
pub fn expand_allowed_roles(entries: &[String]) -> Result<Vec<Role>, Error> {
    let mut roles: Vec<Role> = Vec::new();
    for entry in entries {
        let expanded = match entry.strip_prefix('@') {
            Some(group) => RoleGroup::from_name(group)
                .ok_or_else(|| Error::InvalidRole(entry.clone()))?
                .to_roles(),
            None => vec![Role::new(entry)?],
        };
        for role in expanded {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_normalizes() {
        let role = Role::new("  Admin ").unwrap();
        assert_eq!(role.as_str(), "admin");
        assert!(Role::new("   ").is_err());
    }

    #[test]
    fn test_role_serde_normalizes() {
        let role: Role = serde_json::from_str("\"SHOP\"").unwrap();
        assert_eq!(role.as_str(), "shop");
        assert!(serde_json::from_str::<Role>("\"\"").is_err());
    }

    #[test]
    fn test_identity_anonymous_has_no_role() {
        let identity = Identity::anonymous("guest-1");
        assert!(identity.is_anonymous());
        assert_eq!(identity.user_id, "guest-1");
        assert!(identity.email.is_none());
    }

    #[test]
    fn test_identity_serializes_camel_case() {
        let mut identity = Identity::new("u1", Role::new("user").unwrap()).with_email("u1@example.com");
        identity.full_name = Some("User One".to_string());
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["fullName"], "User One");
        assert!(json.get("avatar").is_none());
    }

    #[test]
    fn test_role_group_membership() {
        let shop = Role::new("shop").unwrap();
        assert!(RoleGroup::ShopChat.allows(&shop));
        assert!(!RoleGroup::AdminChat.allows(&shop));
        assert!(!RoleGroup::Staff.allows(&Role::new("user").unwrap()));
    }

    #[test]
    fn test_role_group_names_roundtrip() {
        for group in RoleGroup::all() {
            assert_eq!(RoleGroup::from_name(group.name()), Some(*group));
        }
        assert_eq!(RoleGroup::from_name("nobody"), None);
    }

    #[test]
    fn test_expand_allowed_roles_groups_and_literals() {
        let roles = expand_allowed_roles(&["@staff".to_string(), "ai".to_string(), "admin".to_string()])
            .unwrap();
        let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
        assert_eq!(names, vec!["admin", "super_admin", "ai"]);
    }

    #[test]
    fn test_expand_allowed_roles_unknown_group() {
        assert!(expand_allowed_roles(&["@vip".to_string()]).is_err());
    }
}
