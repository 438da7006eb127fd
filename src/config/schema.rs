//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Connection string used when no database URI is configured.
pub const DEFAULT_DATABASE_URI: &str = "mongodb://localhost/conduit";

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 3000;

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment mode (selects verbose vs sanitized error bodies).
    pub environment: Environment,

    /// Listener configuration (host, port).
    pub server: ServerConfig,

    /// Document database settings.
    pub database: DatabaseConfig,

    /// Cookie session settings.
    pub session: SessionConfig,

    /// Log verbosity.
    pub logging: LoggingConfig,

    /// Request body and static file settings.
    pub http: HttpConfig,
}

impl AppConfig {
    /// Whether error bodies should carry full error details.
    pub fn verbose_errors(&self) -> bool {
        !self.environment.is_production()
    }
}

/// Deployment mode.
///
/// Only the exact value `production` selects production mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        if name == "production" {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port. Port 0 asks the OS for an ephemeral port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Document database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string.
    pub uri: String,

    /// Emit every driver command through the log.
    pub debug: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_DATABASE_URI.to_string(),
            debug: false,
        }
    }
}

/// Cookie session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie name.
    pub cookie_name: String,

    /// Secret used to sign the session id carried in the cookie.
    pub secret: String,

    /// Session lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "conduit.sid".to_string(),
            secret: "conduit".to_string(),
            max_age_secs: 60,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl LoggingConfig {
    /// Request logging runs only below the `warn` threshold.
    pub fn request_logging_enabled(&self) -> bool {
        self.level < LogLevel::Warn
    }
}

/// Log verbosity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Silent = 5,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Silent => "silent",
            other => other.as_directive(),
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" | "off" => Ok(LogLevel::Silent),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Request body and static file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Maximum buffered request body size in bytes.
    pub body_limit_bytes: usize,

    /// Directory served at the application root.
    pub static_dir: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            body_limit_bytes: 100 * 1024, // 100KB
            static_dir: "public".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.uri, "mongodb://localhost/conduit");
        assert!(!config.database.debug);
        assert_eq!(config.session.secret, "conduit");
        assert_eq!(config.session.max_age_secs, 60);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.verbose_errors());
    }

    #[test]
    fn test_request_logging_threshold() {
        let mut logging = LoggingConfig::default();
        assert!(logging.request_logging_enabled());

        logging.level = LogLevel::Debug;
        assert!(logging.request_logging_enabled());

        logging.level = LogLevel::Warn;
        assert!(!logging.request_logging_enabled());

        logging.level = LogLevel::Silent;
        assert!(!logging.request_logging_enabled());
    }

    #[test]
    fn test_environment_from_name() {
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name("Production"), Environment::Development);
        assert_eq!(Environment::from_name("test"), Environment::Development);
        assert_eq!(Environment::from_name(""), Environment::Development);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("off".parse::<LogLevel>(), Ok(LogLevel::Silent));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Silent.to_string(), "silent");
    }

    #[test]
    fn test_parse_toml_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            environment = "production"

            [server]
            port = 8080

            [logging]
            level = "error"
            "#,
        )
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, LogLevel::Error);
        assert_eq!(config.database.uri, DEFAULT_DATABASE_URI);
    }
}
