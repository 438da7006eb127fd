//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{AppConfig, Environment, LogLevel};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from defaults plus variables resolved by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        config.apply_env(lookup)?;
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Overlay environment variables on top of the current values.
    ///
    /// Empty `PORT` and `MONGODB_URI` count as unset. `MONGODB_DEBUG` only
    /// needs to be present.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("NODE_ENV") {
            self.environment = Environment::from_name(&env);
        }

        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port.trim().parse().map_err(|e| ConfigError::InvalidVar {
                var: "PORT",
                reason: format!("'{}': {}", port, e),
            })?;
        }

        if let Some(uri) = lookup("MONGODB_URI").filter(|v| !v.is_empty()) {
            self.database.uri = uri;
        }

        if lookup("MONGODB_DEBUG").is_some() {
            self.database.debug = true;
        }

        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.logging.level = level
                .parse::<LogLevel>()
                .map_err(|reason| ConfigError::InvalidVar { var: "LOG_LEVEL", reason })?;
        }

        Ok(())
    }
}
