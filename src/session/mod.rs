//! Cookie session subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie: conduit.sid=s:<id>.<signature>
//!     → signing.rs (verify signature against the secret)
//!     → store.rs (look up live, unexpired data)
//!     → handle.rs (Session extension seen by handlers)
//!     → layer.rs (after the response: save / touch / destroy, Set-Cookie)
//! ```
//!
//! # Design Decisions
//! - Sessions live in process memory only; a restart logs everyone out
//! - New sessions are stored only once something is written to them
//! - Unmodified sessions are never rewritten, only their expiry moves

pub mod handle;
pub mod layer;
pub mod signing;
pub mod store;

pub use handle::Session;
pub use layer::{attach_session, SessionManager};
pub use store::{SessionData, SessionStore};
