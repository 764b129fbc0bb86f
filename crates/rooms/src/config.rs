//! Environment-driven configuration for the rooms service
//!
//! All variables use the `ROOMS_` prefix. Defaults suit local development;
//! `.env` files are honored via dotenvy in `main`.

use std::env;

#[derive(Debug, Clone)]
pub struct RoomsConfig {
    /// Bind host (`ROOMS_HOST`, default `0.0.0.0`)
    pub host: String,

    /// Bind port (`ROOMS_PORT`, default `8084`)
    pub port: u16,

    /// Optional Postgres URL for the result sink (`ROOMS_DATABASE_URL`).
    /// When unset, finalized results are broadcast only.
    pub database_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl RoomsConfig {
    /// Load configuration from environment variables and validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("ROOMS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("ROOMS_PORT")
            .unwrap_or_else(|_| "8084".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid {
                var: "ROOMS_PORT",
                reason: e.to_string(),
            })?;
        let database_url = env::var("ROOMS_DATABASE_URL").ok();

        let config = Self {
            host,
            port,
            database_url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid {
                var: "ROOMS_HOST",
                reason: "host must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                var: "ROOMS_PORT",
                reason: "port must be non-zero".to_string(),
            });
        }
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(ConfigError::Invalid {
                    var: "ROOMS_DATABASE_URL",
                    reason: "must be a postgres:// URL".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8084,
            database_url: None,
        }
    }
}
