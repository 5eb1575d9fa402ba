use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_MAX_RECIPE_DEPTH: u32 = 32;
const DEFAULT_MAX_PAGE_SIZE: u64 = 500;
const DEFAULT_ROLLUP_WORKERS: usize = 4;
const DEFAULT_FACET_CHUNK_SIZE: usize = 1024;

/// Engine configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Deepest recipe nesting the resolver follows before reporting a cycle
    #[serde(default = "default_max_recipe_depth")]
    #[validate(range(min = 1, max = 256))]
    pub max_recipe_depth: u32,

    /// Upper bound applied to any requested page size
    #[serde(default = "default_max_page_size")]
    #[validate(range(min = 1))]
    pub max_page_size: u64,

    /// Number of concurrent tasks used for group rollups and facet projections
    #[serde(default = "default_rollup_workers")]
    #[validate(range(min = 1, max = 64))]
    pub rollup_workers: usize,

    /// Products handled per facet projection task
    #[serde(default = "default_facet_chunk_size")]
    #[validate(range(min = 1))]
    pub facet_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            max_recipe_depth: default_max_recipe_depth(),
            max_page_size: default_max_page_size(),
            rollup_workers: default_rollup_workers(),
            facet_chunk_size: default_facet_chunk_size(),
        }
    }
}

impl EngineConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_max_recipe_depth() -> u32 {
    DEFAULT_MAX_RECIPE_DEPTH
}

fn default_max_page_size() -> u64 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_rollup_workers() -> usize {
    DEFAULT_ROLLUP_WORKERS
}

fn default_facet_chunk_size() -> usize {
    DEFAULT_FACET_CHUNK_SIZE
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("recipe_engine={},recipe_cli={}", level, level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads engine configuration from the `config` directory of the working directory.
pub fn load_config() -> Result<EngineConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads engine configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (`{dir}/default.toml`)
/// 3. Environment-specific config (`{dir}/{env}.toml`)
/// 4. Environment variables (`APP__*`)
pub fn load_config_from(dir: &Path) -> Result<EngineConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("max_recipe_depth", i64::from(DEFAULT_MAX_RECIPE_DEPTH))?
        .set_default("max_page_size", DEFAULT_MAX_PAGE_SIZE as i64)?
        .set_default("rollup_workers", DEFAULT_ROLLUP_WORKERS as i64)?
        .set_default("facet_chunk_size", DEFAULT_FACET_CHUNK_SIZE as i64)?
        .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
        .add_source(File::with_name(&dir.join(&run_env).to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let engine_config: EngineConfig = config.try_deserialize()?;

    engine_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(engine_config)
}
