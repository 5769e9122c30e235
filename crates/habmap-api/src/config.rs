use std::env;
use std::path::PathBuf;

use habmap_core::config::LayeredConfig;

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origin: String,
    /// Optional TOML file layered under the environment
    pub config_path: Option<PathBuf>,
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = env::var("HABMAP_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(5000);

        let cors_origin =
            env::var("HABMAP_CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5000".to_string());

        let config_path = env::var("HABMAP_CONFIG").ok().map(PathBuf::from);

        Self { port, cors_origin, config_path }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Defaults, then the optional TOML file, then `HABMAP_*` variables
    pub fn layered_config(&self) -> habmap_core::Result<LayeredConfig> {
        let mut config = LayeredConfig::with_defaults();
        if let Some(path) = &self.config_path {
            config = config.load_from_file(path)?;
        }
        let config = config.load_from_env();
        config.validate()?;
        Ok(config)
    }
}
