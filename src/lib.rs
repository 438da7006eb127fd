//! Conduit API server bootstrap.
//!
//! Wires the middleware pipeline, cookie sessions, the shared document
//! database connection and domain setup hooks around an externally supplied
//! router, and funnels every error through one JSON error formatter.
//!
//! ```text
//!   request ──▶ CORS ─▶ trace ─▶ error formatter ─▶ body parser ─▶ method override
//!                                                                      │
//!   response ◀──────────────────────────────────────────────  static ◀─┘
//!                                                               │ miss
//!                                                               ▼
//!                                                  session ─▶ router ─▶ not found
//! ```

// Core subsystems
pub mod config;
pub mod database;
pub mod http;
pub mod routes;
pub mod session;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use database::DocumentStore;
pub use http::{ApiError, AppState};
pub use lifecycle::{DomainSetup, ServerBuilder, ServerHandle, StartupError};
