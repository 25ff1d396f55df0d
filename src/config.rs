//! Server configuration.
//!
//! Only the listen address comes from the environment; pipeline queue
//! capacities and timeouts are compile-time constants of the session
//! module.

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `HOST` and `PORT` environment variables,
    /// falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("HOST") {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port))?;
        }
        Ok(config)
    }

    /// Socket address string for the listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
