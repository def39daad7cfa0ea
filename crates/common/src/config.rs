//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Poll announcement notification configuration.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration for the change feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Pub/Sub channels.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Outbound notification dispatch configuration.
///
/// When `endpoint` is unset, poll-announcement delivery is disabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// HTTP endpoint of the notification function.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token sent with each dispatch.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "livepoll".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `LIVEPOLL_ENV`)
    /// 3. Environment variables with `LIVEPOLL_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("LIVEPOLL_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LIVEPOLL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("LIVEPOLL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_config_defaults_disabled() {
        let config: NotifyConfig = serde_json::from_str("{}").unwrap();
        assert!(config.endpoint.is_none());
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_deserialize() {
        let raw = serde_json::json!({
            "server": { "url": "http://localhost:3000" },
            "database": { "url": "postgres://localhost/livepoll" },
            "redis": { "url": "redis://localhost:6379" },
        });
        let config: Config = serde_json::from_value(raw).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.redis.prefix, "livepoll");
    }
}
