//! API error type and the terminal error formatter.
//!
//! Handlers and middleware return [`ApiError`]. Turning one into a response
//! yields a sanitized placeholder that carries the error in its extensions;
//! [`format_errors`] sits near the outside of the pipeline, logs the error and
//! replaces the placeholder with the final JSON body:
//!
//! ```text
//! {"errors": {"message": "...", "error": {...}}}
//! ```
//!
//! `error` holds the full error object when the formatter is verbose
//! (non-production) and `{}` otherwise.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Category of an [`ApiError`], each with a default HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Validation,
    Unauthorized,
    Forbidden,
    PayloadTooLarge,
    UnsupportedMediaType,
    ServiceUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn default_status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::UnsupportedMediaType => "unsupported_media_type",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Internal => "internal",
        }
    }

    /// Kind for a bare status produced outside this crate's handlers.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ErrorKind::BadRequest,
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::PAYLOAD_TOO_LARGE => ErrorKind::PayloadTooLarge,
            StatusCode::UNSUPPORTED_MEDIA_TYPE => ErrorKind::UnsupportedMediaType,
            StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
            StatusCode::SERVICE_UNAVAILABLE => ErrorKind::ServiceUnavailable,
            s if s.is_client_error() => ErrorKind::BadRequest,
            _ => ErrorKind::Internal,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::BadRequest => "BadRequestError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Unauthorized => "UnauthorizedError",
            ErrorKind::Forbidden => "ForbiddenError",
            ErrorKind::PayloadTooLarge => "PayloadTooLargeError",
            ErrorKind::UnsupportedMediaType => "UnsupportedMediaTypeError",
            ErrorKind::ServiceUnavailable => "ServiceUnavailableError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

/// Error returned by handlers and middleware.
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
    source: Option<BoxError>,
    backtrace: Backtrace,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
            backtrace: Backtrace::capture(),
        }
    }

    /// The error produced for requests no route matched.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, "Not Found")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Override the status derived from the kind.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status for this error: the explicit override if one was set,
    /// otherwise the kind's default.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.kind.default_status())
    }

    /// Human-readable trace: the error line, its cause chain and, when
    /// backtraces are enabled, the captured backtrace. Never empty.
    pub fn stack(&self) -> String {
        let mut stack = format!("{}: {}", self.kind.label(), self.message);

        let mut cause = self.source();
        while let Some(err) = cause {
            stack.push_str("\n    caused by: ");
            stack.push_str(&err.to_string());
            cause = err.source();
        }

        if self.backtrace.status() == BacktraceStatus::Captured {
            stack.push('\n');
            stack.push_str(&self.backtrace.to_string());
        }

        stack
    }

    /// Full error object exposed to clients outside production.
    pub fn to_json(&self) -> Value {
        json!({
            "message": self.message,
            "status": self.status().as_u16(),
            "kind": self.kind.as_str(),
            "stack": self.stack(),
        })
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("status", &self.status())
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

/// Response extension marking a response as a not-yet-formatted error.
#[derive(Clone)]
struct PendingError(Arc<ApiError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = ErrorFormatter::new(false).body(&self);
        response.extensions_mut().insert(PendingError(Arc::new(self)));
        response
    }
}

/// Renders errors as JSON. Built once at startup.
#[derive(Debug, Clone, Copy)]
pub struct ErrorFormatter {
    verbose: bool,
}

impl ErrorFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Log the error, then build its response.
    pub fn render(&self, err: &ApiError) -> Response {
        tracing::error!(
            status = err.status().as_u16(),
            kind = err.kind().as_str(),
            "{}",
            err.stack()
        );
        self.body(err)
    }

    fn body(&self, err: &ApiError) -> Response {
        let detail = if self.verbose {
            err.to_json()
        } else {
            json!({})
        };

        let body = json!({
            "errors": {
                "message": err.message(),
                "error": detail,
            }
        });

        (err.status(), Json(body)).into_response()
    }
}

/// Largest body of a bare error response kept as the error's cause.
const BARE_BODY_LIMIT: usize = 4 * 1024;

/// Middleware giving every error response the JSON error shape.
///
/// Pending [`ApiError`]s are rendered directly. Other 4xx/5xx responses
/// (extractor rejections, handlers returning a bare status) are rebuilt from
/// their status, keeping their original body as the cause.
pub async fn format_errors(
    State(formatter): State<ErrorFormatter>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if let Some(PendingError(err)) = response.extensions().get::<PendingError>() {
        return formatter.render(err);
    }

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return formatter.render(&bare_status_error(response).await);
    }

    response
}

async fn bare_status_error(response: Response) -> ApiError {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("Error");
    let err = ApiError::new(ErrorKind::from_status(status), reason).with_status(status);

    match axum::body::to_bytes(response.into_body(), BARE_BODY_LIMIT).await {
        Ok(bytes) if !bytes.is_empty() => {
            err.with_source(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => err,
    }
}

/// Fallback for requests no route matched.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

/// Turn a caught panic into an internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::internal("Internal Server Error")
        .with_source(format!("handler panicked: {}", detail))
        .into_response()
}
