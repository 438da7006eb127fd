//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → http::server request spans (TraceLayer, x-request-id)
//!
//! Consumers:
//!     → stdout (fmt layer)
//! ```
//!
//! # Design Decisions
//! - Structured fields, not interpolated strings, for anything searchable
//! - Request ID flows through every request span
//! - Request logging is skipped entirely at `warn` and quieter

pub mod logging;
