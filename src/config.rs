//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub activitypub: ActivityPubConfig,
    /// Published blogs keyed by their short name
    #[serde(default)]
    pub blogs: HashMap<String, BlogConfig>,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "blog.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public address of the site
    ///
    /// # Returns
    /// Full URL like "https://blog.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Federation configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ActivityPubConfig {
    /// Mount inbox and discovery routes and federate posts
    #[serde(default)]
    pub enabled: bool,
    /// PEM-encoded RSA private key used to sign outbound requests
    pub key_path: Option<PathBuf>,
}

/// A single published blog
#[derive(Debug, Clone, Deserialize)]
pub struct BlogConfig {
    /// Path prefix of the blog (e.g. "/" or "/en")
    pub path: String,
    /// Sections whose posts are federated. Empty means any non-empty section.
    #[serde(default)]
    pub sections: Vec<String>,
}

impl BlogConfig {
    /// Whether posts of `section` are visible to followers
    pub fn is_federated_section(&self, section: &str) -> bool {
        if section.is_empty() {
            return false;
        }
        self.sections.is_empty() || self.sections.iter().any(|s| s == section)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (BLOGFED_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/blogfed.db")?
            .set_default("activitypub.enabled", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("BLOGFED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Public identity IRI of a blog (`<base_url><blog path>`)
    pub fn blog_iri(&self, blog: &BlogConfig) -> String {
        format!("{}{}", self.server.base_url(), blog.path)
    }

    /// Look up a blog by name together with its identity IRI
    pub fn blog(&self, name: &str) -> Option<(&BlogConfig, String)> {
        self.blogs
            .get(name)
            .map(|blog| (blog, self.blog_iri(blog)))
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.server.domain.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "server.domain must not be empty".to_string(),
            ));
        }

        for (name, blog) in &self.blogs {
            if !blog.path.starts_with('/') {
                return Err(crate::error::AppError::Config(format!(
                    "blogs.{}.path must start with '/'",
                    name
                )));
            }
        }

        if self.activitypub.enabled && self.activitypub.key_path.is_none() {
            return Err(crate::error::AppError::Config(
                "activitypub.key_path is required when activitypub.enabled=true".to_string(),
            ));
        }

        Ok(())
    }
}
