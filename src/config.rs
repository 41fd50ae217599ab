//! Configuration loader and validator for the garden service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub database_file: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// SQLite URL of the configured database file inside `app.data_dir`.
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}/{}",
            self.app.data_dir.trim_end_matches('/'),
            self.app.database_file
        )
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    let file = cfg.app.database_file.trim();
    if file.is_empty() {
        return Err(ConfigError::Invalid("app.database_file must be non-empty"));
    }
    if file.contains('/') || file.contains('?') {
        return Err(ConfigError::Invalid(
            "app.database_file must be a plain file name",
        ));
    }
    if cfg.app.max_connections == 0 {
        return Err(ConfigError::Invalid("app.max_connections must be > 0"));
    }
    Ok(())
}

/// Sample configuration accepted by [`load`].
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  database_file: "gardens.db"
  max_connections: 5
"#
}
