//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Connect database → Setup hooks → Build app → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     ServerHandle::shutdown → Stop accepting → Drain requests → Close database
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls ServerHandle::shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then database, then domain, listener last
//! - Ordered shutdown: stop accept, drain, close
//! - No restarts or retries; a failed start is returned to the caller

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{ServerHandle, Shutdown, ShutdownError};
pub use signals::shutdown_signal;
pub use startup::{start, DomainSetup, ServerBuilder, StartupError};
