//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};

/// Minimum accepted length of the JWT signing secret, in bytes.
const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// SQLite connection URL (default: sqlite://quill.db?mode=rwc).
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    ///
    /// In-memory databases always use a single connection.
    pub database_max_connections: u32,

    /// HMAC secret used to sign bearer tokens. Required.
    pub jwt_secret: String,

    /// Bearer token lifetime in seconds (default: 86400).
    pub token_lifetime_secs: i64,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Argon2 memory cost in KiB (default: 19456).
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 2).
    pub argon2_iterations: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quill.db?mode=rwc".to_string());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let jwt_secret =
            env::var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;

        let token_lifetime_secs = env::var("TOKEN_LIFETIME_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .context("TOKEN_LIFETIME_SECS must be a valid i64")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let argon2_memory_kib = env::var("ARGON2_MEMORY_KIB")
            .unwrap_or_else(|_| "19456".to_string())
            .parse()
            .context("ARGON2_MEMORY_KIB must be a valid u32")?;

        let argon2_iterations = env::var("ARGON2_ITERATIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .context("ARGON2_ITERATIONS must be a valid u32")?;

        let config = Self {
            port,
            database_url,
            database_max_connections,
            jwt_secret,
            token_lifetime_secs,
            cors_allowed_origins,
            argon2_memory_kib,
            argon2_iterations,
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that would leave the service insecure or unusable.
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes");
        }
        if self.token_lifetime_secs <= 0 {
            bail!("TOKEN_LIFETIME_SECS must be positive");
        }
        if self.database_max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        Ok(())
    }

    /// Whether the configured database lives only in memory.
    pub fn is_memory_database(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}
