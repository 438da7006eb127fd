//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (lifecycle::startup)
//!     → server.rs (middleware pipeline, static files)
//!     → middleware/ (body parsing, method override)
//!     → session layer → external router
//!     → error.rs (not-found fallback, JSON error formatting)
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod server;

pub use error::{ApiError, ErrorFormatter, ErrorKind};
pub use server::{build_app, AppState};
