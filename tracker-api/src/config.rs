/// Configuration management for the API server
///
/// Sources, lowest precedence first:
///
/// 1. Built-in defaults
/// 2. `tracker.toml` in the working directory (or an explicit path)
/// 3. `TRACKER_*` environment variables, `__` separating sections
///    (e.g. `TRACKER_API__PORT=9000`, `TRACKER_POLICY__MANAGER_DELETE_OVERRIDE=true`)
/// 4. `DATABASE_URL` and `JWT_SECRET`, if set
///
/// A `.env` file is loaded into the environment first when present.
///
/// # Example
///
/// ```no_run
/// use tracker_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load(None)?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::path::Path;

use anyhow::Context;
use config::{builder::DefaultState, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracker_shared::auth::authorization::Policy;
use tracker_shared::db::pool;

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "tracker.toml";

/// Minimum JWT secret length in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing secret, at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Authorization policy switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Let Project Managers delete projects they are not members of
    #[serde(default)]
    pub manager_delete_override: bool,
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_default("api.host", "0.0.0.0")?
        .set_default("api.port", 8080)?
        .set_default("api.cors_origins", Vec::<String>::new())?
        .set_default("database.url", "")?
        .set_default("database.max_connections", 10)?
        .set_default("jwt.secret", "")?
        .set_default("policy.manager_delete_override", false)
}

impl Config {
    /// Loads configuration from defaults, file and environment
    ///
    /// An explicit `path` must exist; the default `tracker.toml` is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed, a value has the wrong
    /// type, or validation fails (see [`Config::validate`])
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = with_defaults(config::Config::builder())?;

        builder = match path {
            Some(path) => {
                if !Path::new(path).exists() {
                    anyhow::bail!("Configuration file not found: {}", path);
                }
                builder.add_source(File::new(path, FileFormat::Toml))
            }
            None => builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false)),
        };

        builder = builder
            .add_source(
                Environment::with_prefix("TRACKER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?;

        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string on top of the defaults
    ///
    /// Environment variables are not consulted.
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let config: Self = with_defaults(config::Config::builder())?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Checks required values
    ///
    /// # Errors
    ///
    /// Returns an error if the database URL is empty, the JWT secret is
    /// shorter than 32 bytes, or the port is 0
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("database.url is required (or set DATABASE_URL)");
        }

        if self.jwt.secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "jwt.secret must be at least {} characters long (or set JWT_SECRET)",
                MIN_JWT_SECRET_LEN
            );
        }

        if self.api.port == 0 {
            anyhow::bail!("api.port must be greater than 0");
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Connection pool settings for this configuration
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            max_connections: self.database.max_connections,
            ..pool::DatabaseConfig::new(self.database.url.clone())
        }
    }

    /// Authorization policy for this configuration
    pub fn policy(&self) -> Policy {
        Policy::default().with_manager_delete_override(self.policy.manager_delete_override)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [database]
        url = "postgresql://localhost/tracker_test"

        [jwt]
        secret = "test-secret-key-at-least-32-bytes-long"
    "#;

    #[test]
    fn test_defaults_fill_missing_values() {
        let config = Config::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.api.cors_origins.is_empty());
        assert!(!config.policy.manager_delete_override);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [api]
            host = "127.0.0.1"
            port = 9000
            cors_origins = ["http://localhost:3000"]

            [policy]
            manager_delete_override = true
            "#
        );
        let config = Config::from_toml_str(&toml).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.api.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(config.policy.manager_delete_override);
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let toml = r#"
            [database]
            url = "postgresql://localhost/tracker_test"

            [jwt]
            secret = "too-short"
        "#;

        let err = Config::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("jwt.secret"));
    }

    #[test]
    fn test_missing_database_url_rejected() {
        let toml = r#"
            [jwt]
            secret = "test-secret-key-at-least-32-bytes-long"
        "#;

        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_pool_config_and_policy() {
        let config = Config::from_toml_str(MINIMAL).unwrap();

        let pool = config.pool_config();
        assert_eq!(pool.url, "postgresql://localhost/tracker_test");
        assert_eq!(pool.max_connections, 10);

        assert_eq!(config.policy(), Policy::default());
    }
}
