/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is
/// honored in development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `JWT_SECRET`: session token signing secret, at least 32 characters (required)
/// - `SESSION_HOURS_ADMINISTRATOR`: administrator session lifetime (default: 8)
/// - `SESSION_HOURS_SEEKING_ORGANIZATION`: organization session lifetime (default: 24)
/// - `SESSION_HOURS_USER`: user session lifetime (default: 24)
/// - `BOOTSTRAP_ADMIN_LOGIN` / `BOOTSTRAP_ADMIN_PASSWORD`: administrator created
///   at start-up when missing (both or neither)
/// - `RUST_LOG`: log filter
///
/// # Example
///
/// ```no_run
/// use marketdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::{bail, Context};
use marketdesk_shared::auth::provider::SessionPolicies;
use marketdesk_shared::models::account::AccountClass;
use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session token signing secret
    ///
    /// Generate with: `openssl rand -hex 32`
    pub jwt_secret: String,

    pub session_hours_administrator: i64,
    pub session_hours_seeking_organization: i64,
    pub session_hours_user: i64,

    /// Administrator ensured at start-up
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials of the start-up administrator
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub login_id: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Session policies with the configured lifetimes
    pub fn session_policies(&self) -> SessionPolicies {
        SessionPolicies::default()
            .with_lifetime_hours(AccountClass::Administrator, self.session_hours_administrator)
            .with_lifetime_hours(
                AccountClass::SeekingOrganization,
                self.session_hours_seeking_organization,
            )
            .with_lifetime_hours(AccountClass::User, self.session_hours_user)
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("API_PORT", "8080")
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = matches!(
            var("PRODUCTION", "false").to_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }

        let hours = |key: &str, default: &str| -> anyhow::Result<i64> {
            let value = var(key, default)
                .parse::<i64>()
                .with_context(|| format!("{} must be a whole number of hours", key))?;
            if value <= 0 {
                bail!("{} must be positive", key);
            }
            Ok(value)
        };

        let bootstrap_admin = match (lookup("BOOTSTRAP_ADMIN_LOGIN"), lookup("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(login_id), Some(password)) => Some(BootstrapAdmin { login_id, password }),
            (None, None) => None,
            _ => bail!("BOOTSTRAP_ADMIN_LOGIN and BOOTSTRAP_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            auth: AuthConfig {
                jwt_secret,
                session_hours_administrator: hours("SESSION_HOURS_ADMINISTRATOR", "8")?,
                session_hours_seeking_organization: hours("SESSION_HOURS_SEEKING_ORGANIZATION", "24")?,
                session_hours_user: hours("SESSION_HOURS_USER", "24")?,
                bootstrap_admin,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
