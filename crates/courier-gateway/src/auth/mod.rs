//! Handshake authentication.
//!
//! - [`IdentityResolver`] verifies a bearer token ([`JwtResolver`] for HS256).
//! - [`UserDirectory`] projects the verified token into a [`UserProfile`].
//! - [`Authenticator`] runs both per connection and owns the resulting
//!   connection → identity table.

mod authenticator;
mod directory;
mod resolver;

pub use authenticator::Authenticator;
pub use directory::{directory_from_config, ClaimsDirectory, MemoryDirectory, UserDirectory, UserProfile};
pub use resolver::{Claims, DisabledResolver, IdentityResolver, JwtResolver, VerifiedToken};

use axum::http::{header, HeaderMap};
use std::collections::HashMap;

/// Query parameter carrying a bearer token for clients that cannot set headers.
pub const TOKEN_PARAM: &str = "token";

/// Query parameter carrying an explicit anonymous user id.
pub const USER_ID_PARAM: &str = "userId";

/// Credentials presented with a socket upgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    /// Bearer token, from the `Authorization` header or the `token` parameter.
    pub bearer: Option<String>,

    /// Explicit anonymous user id.
    pub anonymous_user_id: Option<String>,
}

impl Handshake {
    /// Extract credentials from upgrade request headers and query parameters.
    ///
    /// The header wins over the query parameter. Blank values count as absent.
    pub fn from_request(headers: &HeaderMap, query: &HashMap<String, String>) -> Self {
        let header_token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(non_blank);

        let bearer = header_token.or_else(|| query.get(TOKEN_PARAM).and_then(|v| non_blank(v)));
        let anonymous_user_id = query.get(USER_ID_PARAM).and_then(|v| non_blank(v));

        Self {
            bearer,
            anonymous_user_id,
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
