//! Configuration for the ENCV service
//!
//! CLI arguments with environment variable fallbacks, using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// ENCV - permissioned data capture for the education and health strands
#[derive(Parser, Debug, Clone)]
#[command(name = "encv")]
#[command(about = "Participant data capture and export service for the ENCV project")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store fallback, insecure JWT default)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "encv")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "28800")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Public origin used to build media download links in exports
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:8080")]
    pub public_base_url: String,

    /// URL prefix media files are served under
    #[arg(long, env = "MEDIA_URL", default_value = "/media/")]
    pub media_url: String,

    /// Directory the latest export is kept in (optional)
    #[arg(long, env = "EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Password for the admin account seeded into an empty dev store
    #[arg(long, env = "DEV_ADMIN_PASSWORD")]
    pub dev_admin_password: Option<String>,

    /// Username for the seeded dev admin
    #[arg(long, env = "DEV_ADMIN_USERNAME", default_value = "admin")]
    pub dev_admin_username: String,
}

impl Args {
    /// Effective JWT secret; dev mode falls back to a fixed insecure value
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-only-insecure-secret-do-not-deploy".to_string()),
            (None, false) => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None if !self.dev_mode => {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            Some(secret) if secret.len() < 32 => {
                return Err("JWT_SECRET must be at least 32 characters".to_string());
            }
            _ => {}
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        if !(self.public_base_url.starts_with("http://")
            || self.public_base_url.starts_with("https://"))
        {
            return Err("PUBLIC_BASE_URL must start with http:// or https://".to_string());
        }

        if !self.dev_mode && self.dev_admin_password.is_some() {
            return Err("DEV_ADMIN_PASSWORD is only accepted in dev mode".to_string());
        }

        Ok(())
    }
}
