//! Configuration for Folio
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::jwt::DEFAULT_EXPIRY_SECONDS;
use crate::services::SeedConfig;

/// Password given to the bootstrap admin in dev mode when none is set
const DEV_ADMIN_PASSWORD: &str = "admin";

/// Folio - headless content backend
#[derive(Parser, Debug, Clone)]
#[command(name = "folio")]
#[command(about = "Schema-driven content collections behind a role-gated REST API")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "folio")]
    pub mongodb_db: String,

    /// Keep all data in process instead of MongoDB (lost on exit)
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// Deadline for every store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "5000")]
    pub store_timeout_ms: u64,

    /// Secret for signing JWTs
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value_t = DEFAULT_EXPIRY_SECONDS)]
    pub jwt_expiry_seconds: u64,

    /// Username of the bootstrap admin account
    #[arg(long, env = "ADMIN_USERNAME", default_value = "adminUser")]
    pub admin_username: String,

    /// Email of the bootstrap admin account
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@sample.com")]
    pub admin_email: String,

    /// Password of the bootstrap admin account
    #[arg(long, env = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,

    /// Reject content fields that do not match the content type's schema
    #[arg(long, env = "STRICT_SCHEMA", default_value = "false")]
    pub strict_schema: bool,

    /// Enable development mode (insecure defaults, in-memory fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.as_deref().map_or(true, str::is_empty) {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            if self.admin_password.as_deref().map_or(true, str::is_empty) {
                return Err("ADMIN_PASSWORD is required in production mode".to_string());
            }
        }

        if self.store_timeout_ms == 0 {
            return Err("STORE_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Bootstrap admin credentials, with the dev fallback password
    pub fn seed_config(&self) -> SeedConfig {
        SeedConfig {
            admin_username: self.admin_username.clone(),
            admin_email: self.admin_email.clone(),
            admin_password: self
                .admin_password
                .clone()
                .unwrap_or_else(|| DEV_ADMIN_PASSWORD.to_string()),
        }
    }
}
