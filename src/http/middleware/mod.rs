//! Request interceptors that run ahead of routing.

pub mod body_parser;
pub mod method_override;

pub use body_parser::{parse_body, BodyLimit, ParsedBody};
pub use method_override::{override_method, OriginalMethod, X_HTTP_METHOD_OVERRIDE};
