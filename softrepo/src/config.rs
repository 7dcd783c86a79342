//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: SOFTREPO_, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/softrepo/{service_name}/config.toml
//! 4. Default values
//!
//! ```toml
//! [service]
//! name = "orders"
//! log_level = "debug"
//!
//! [repository]
//! default_page_size = 25
//! max_page_size = 200
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const APP_PREFIX: &str = "softrepo";
const ENV_PREFIX: &str = "SOFTREPO_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Repository behavior
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

/// Repository configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Page size used when a caller asks for a first page without one
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,

    /// Requested page sizes above this are clamped; zero disables clamping
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,

    /// Whether reads attach results to the unit of work unless told otherwise
    #[serde(default = "default_true")]
    pub tracking_by_default: bool,

    /// Whether saves stamp audit fields and concurrency tokens
    #[serde(default = "default_true")]
    pub audit_enabled: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            tracking_by_default: true,
            audit_enabled: true,
        }
    }
}

fn default_service_name() -> String {
    APP_PREFIX.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_page_size() -> i64 {
    20
}

fn default_max_page_size() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration for the current executable
    ///
    /// The service name is the executable's file stem.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| APP_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later files override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG lookup; environment variables still override.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX);
        if let Some(path) = xdg_dirs.find_config_file(Path::new(service_name).join("config.toml")) {
            paths.push(path);
        }

        paths
    }

    /// Recommended config file location for a service
    ///
    /// Creates the parent directory: ~/.config/softrepo/{service_name}/
    pub fn recommended_path(service_name: &str) -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX);
        let path = xdg_dirs.place_config_file(Path::new(service_name).join("config.toml"))?;
        Ok(path)
    }
}
