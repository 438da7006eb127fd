//! HTTP method override.
//!
//! Lets clients limited to GET/POST issue other verbs. Only POST requests are
//! rewritten, using the `X-HTTP-Method-Override` header or, when absent, a
//! `_method` field in the already parsed body (hidden form field).

use axum::{
    extract::Request,
    http::{HeaderName, Method},
    middleware::Next,
    response::Response,
};

use crate::http::middleware::body_parser::ParsedBody;

pub const X_HTTP_METHOD_OVERRIDE: HeaderName = HeaderName::from_static("x-http-method-override");

/// Body field consulted when the header is missing.
pub const METHOD_FIELD: &str = "_method";

/// The method the client actually sent, recorded when it was overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalMethod(pub Method);

pub async fn override_method(mut request: Request, next: Next) -> Response {
    if request.method() == Method::POST {
        if let Some(method) = requested_method(&request) {
            tracing::debug!(
                from = %request.method(),
                to = %method,
                path = %request.uri().path(),
                "Overriding request method"
            );
            let original = std::mem::replace(request.method_mut(), method);
            request.extensions_mut().insert(OriginalMethod(original));
        }
    }

    next.run(request).await
}

fn requested_method(request: &Request) -> Option<Method> {
    let from_header = request
        .headers()
        .get(&X_HTTP_METHOD_OVERRIDE)
        .and_then(|v| v.to_str().ok());

    let from_body = || {
        request
            .extensions()
            .get::<ParsedBody>()
            .and_then(|body| body.field(METHOD_FIELD))
            .and_then(|v| v.as_str())
    };

    from_header.or_else(from_body).and_then(parse_method)
}

/// Accepts only the standard verbs, case-insensitively.
fn parse_method(name: &str) -> Option<Method> {
    match name.trim().to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "HEAD" => Some(Method::HEAD),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        "OPTIONS" => Some(Method::OPTIONS),
        "TRACE" => Some(Method::TRACE),
        "CONNECT" => Some(Method::CONNECT),
        _ => None,
    }
}
