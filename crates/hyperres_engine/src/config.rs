use std::path::Path;

use serde::Deserialize;
use tracing::{debug, instrument};

use hyperres_base::error::ErrorKind;
use hyperres_base::{HyperresError, HyperresResult, ResultExt, bail, err};

/// Configuration for a hypermedia server, read from `hyperres.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Externally visible base URL. When unset, the request's `Host` header is used.
    pub server_url: Option<String>,
    /// Items per page when the request does not ask for a page size.
    pub default_page_size: usize,
    /// Largest `per_page` a request may ask for.
    pub max_page_size: usize,
    /// Embedded relations deeper than this are rendered as links only.
    pub max_embed_depth: usize,
    /// Media type used when the `Accept` header matches no registered mapper.
    pub default_media_type: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            server_url: None,
            default_page_size: 30,
            max_page_size: 100,
            max_embed_depth: 4,
            default_media_type: "application/json".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> HyperresResult<Self> {
        let config: ServerConfig = toml::from_str(text).map_err(|e| {
            err!(configuration, "invalid server configuration: {}", e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the page sizes: `1 <= default_page_size <= max_page_size`.
    pub fn validate(&self) -> HyperresResult<()> {
        if self.default_page_size == 0 {
            bail!(configuration, "default_page_size must be at least 1");
        }
        if self.default_page_size > self.max_page_size {
            bail!(
                configuration,
                "default_page_size ({}) must not exceed max_page_size ({})",
                self.default_page_size,
                self.max_page_size
            );
        }
        Ok(())
    }
}

/// Load the server configuration from a TOML file.
#[instrument]
pub fn load_config(path: &Path) -> HyperresResult<ServerConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        Box::new(HyperresError::new(ErrorKind::FileError {
            path: path.to_path_buf(),
            source,
        }))
    })?;
    debug!(bytes = text.len(), "read configuration file");
    ServerConfig::from_toml(&text).with_context(|| path.display().to_string())
}
