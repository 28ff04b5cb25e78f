//! Development token issuing.

use crate::load_config;
use clap::Args;
use courier_core::config::AuthConfig;
use courier_core::Role;
use courier_gateway::Claims;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::path::Path;

/// Token command arguments.
#[derive(Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(clap::Subcommand)]
pub enum TokenCommand {
    /// Sign an HS256 bearer token with the configured secret
    Issue {
        /// User ID (token subject)
        #[arg(long)]
        user: String,

        /// Role (user, shop, admin, ...)
        #[arg(long)]
        role: String,

        /// Lifetime in seconds
        #[arg(long, default_value = "3600")]
        ttl: i64,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Email address
        #[arg(long)]
        email: Option<String>,
    },
}

/// Run the token command.
pub async fn run(args: TokenArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        TokenCommand::Issue {
            user,
            role,
            ttl,
            name,
            email,
        } => {
            let config = load_config(config_path)?;
            let mut claims = Claims::new(user, role, chrono::Duration::seconds(ttl));
            claims.name = name;
            claims.email = email;
            println!("{}", issue(&config.auth, claims)?);
        }
    }
    Ok(())
}

/// Sign claims with the configured secret, stamping the configured issuer.
pub fn issue(auth: &AuthConfig, mut claims: Claims) -> anyhow::Result<String> {
    let secret = auth
        .jwt_secret
        .as_ref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("auth.jwt_secret is not configured"))?;
    if claims.sub.trim().is_empty() {
        anyhow::bail!("User ID must not be empty");
    }
    if let Some(role) = claims.role.as_deref() {
        role.parse::<Role>()?;
    }
    if claims.exp <= claims.iat {
        anyhow::bail!("Token lifetime must be positive");
    }
    if let Some(issuer) = &auth.issuer {
        claims = claims.with_issuer(issuer.clone());
    }

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_bytes()),
    )?;
    Ok(token)
}
