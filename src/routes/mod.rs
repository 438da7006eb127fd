//! Built-in routes merged into the application by the binary.

pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::get_health;
use crate::http::server::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new().route("/api/health", get(get_health))
}
