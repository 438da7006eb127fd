//! JSON and URL-encoded body parsing.
//!
//! Buffers bodies whose content type is JSON or form-encoded, decodes them
//! into a [`ParsedBody`] request extension and hands the raw bytes back to
//! the request so axum's own extractors keep working.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use crate::http::error::{ApiError, ErrorKind};

/// Maximum number of body bytes buffered per request.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

/// Decoded request body. An object when no body was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody(pub Value);

impl ParsedBody {
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Look up a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

impl Default for ParsedBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S> FromRequestParts<S> for ParsedBody
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<ParsedBody>().cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Form,
}

pub async fn parse_body(
    State(limit): State<BodyLimit>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(format) = body_format(request.headers())? else {
        let mut request = request;
        request.extensions_mut().insert(ParsedBody::empty());
        return Ok(next.run(request).await);
    };

    let (mut parts, body) = request.into_parts();
    let bytes = read_body(body, limit).await?;

    let parsed = match format {
        BodyFormat::Json => parse_json(&bytes)?,
        BodyFormat::Form => parse_form(&bytes),
    };

    tracing::trace!(format = ?format, bytes = bytes.len(), "Request body parsed");

    parts.extensions.insert(ParsedBody(parsed));
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn body_format(headers: &HeaderMap) -> Result<Option<BodyFormat>, ApiError> {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    let mut params = content_type.split(';').map(str::trim);
    let essence = params.next().unwrap_or_default().to_ascii_lowercase();

    let format = if essence == "application/json" || essence.ends_with("+json") {
        BodyFormat::Json
    } else if essence == "application/x-www-form-urlencoded" {
        BodyFormat::Form
    } else {
        return Ok(None);
    };

    for param in params {
        if let Some((key, value)) = param.split_once('=') {
            let charset = value.trim_matches('"').to_ascii_lowercase();
            if key.trim().eq_ignore_ascii_case("charset") && charset != "utf-8" && charset != "utf8" {
                return Err(ApiError::new(
                    ErrorKind::UnsupportedMediaType,
                    format!("unsupported charset \"{}\"", charset.to_ascii_uppercase()),
                ));
            }
        }
    }

    Ok(Some(format))
}

async fn read_body(body: Body, limit: BodyLimit) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit.0).await.map_err(|err| {
        let inner = err.into_inner();
        if inner.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::new(
                ErrorKind::PayloadTooLarge,
                "request entity too large",
            )
        } else {
            ApiError::bad_request("request aborted").with_source(inner)
        }
    })
}

/// Only objects and arrays are accepted at the top level.
fn parse_json(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {}", e)))?;

    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(ApiError::bad_request(
            "JSON body must be an object or an array",
        )),
    }
}

/// Flat key/value decoding; repeated keys collect into an array.
fn parse_form(bytes: &[u8]) -> Value {
    let mut fields = Map::new();

    for (key, value) in url::form_urlencoded::parse(bytes) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key.into_owned(), value);
            }
        }
    }

    Value::Object(fields)
}
