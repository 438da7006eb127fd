//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay NODE_ENV, PORT, MONGODB_URI, MONGODB_DEBUG, LOG_LEVEL)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed by reference into each subsystem constructor
//! ```
//!
//! # Design Decisions
//! - The environment is read once, at startup, and nowhere else
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, DatabaseConfig, Environment, HttpConfig, LogLevel, LoggingConfig, ServerConfig,
    SessionConfig,
};
