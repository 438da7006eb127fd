//! HTTP application assembly.
//!
//! # Responsibilities
//! - Build the middleware pipeline in its fixed order
//! - Mount the externally supplied router under the session layer
//! - Serve static files ahead of dynamic routes
//!
//! # Pipeline (outermost first)
//! ```text
//! preflight status (204)
//!   → CORS
//!   → request id + trace span        (only below `warn`)
//!   → error formatter                (verbose unless production)
//!   → panic catcher
//!   → body parser (JSON / form)
//!   → method override
//!   → static files (misses fall through)
//!   → session
//!   → router, then the not-found fallback
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::http::error::{format_errors, not_found, panic_response, ErrorFormatter};
use crate::http::middleware::{override_method, parse_body, BodyLimit};
use crate::session::{attach_session, SessionManager};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Build the complete application around `routes`.
pub fn build_app(
    config: &AppConfig,
    state: AppState,
    sessions: SessionManager,
    routes: Router<AppState>,
) -> Router {
    let dynamic = routes
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(middleware::from_fn_with_state(sessions, attach_session))
        .with_state(state);

    let static_files = ServeDir::new(&config.http.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(dynamic);

    let mut app = Router::new()
        .fallback_service(static_files)
        .layer(middleware::from_fn(override_method))
        .layer(middleware::from_fn_with_state(
            BodyLimit(config.http.body_limit_bytes),
            parse_body,
        ));

    app = app
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(
        ErrorFormatter::new(config.verbose_errors()),
        format_errors,
    ));

    if config.logging.request_logging_enabled() {
        app = app
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(request_span)
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
    }

    app.layer(cors_layer())
        .layer(middleware::from_fn(preflight_no_content))
}

/// Answer CORS preflights with 204 rather than the layer's 200.
async fn preflight_no_content(request: Request<Body>, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    let mut response = next.run(request).await;
    if preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Permissive CORS: any origin, the common verbs, request headers mirrored.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseError;
    use crate::http::error::ApiError;
    use crate::http::middleware::ParsedBody;
    use crate::session::Session;
    use async_trait::async_trait;
    use axum::{
        body::to_bytes,
        routing::{get, post, put},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    struct NullStore;

    #[async_trait]
    impl DocumentStore for NullStore {
        fn target(&self) -> &str {
            "null://"
        }

        async fn ping(&self) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn app_with(config: AppConfig, routes: Router<AppState>) -> Router {
        let state = AppState::new(config.clone(), Arc::new(NullStore));
        let sessions = SessionManager::new(&config.session);
        build_app(&config, state, sessions, routes)
    }

    fn base_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.http.static_dir = "does-not-exist".to_string();
        config
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_route_is_json_404() {
        let app = app_with(base_config(), Router::new());

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["errors"]["message"], "Not Found");
        assert_eq!(body["errors"]["error"]["status"], 404);
    }

    #[tokio::test]
    async fn test_production_hides_details() {
        let mut config = base_config();
        config.environment = crate::config::Environment::Production;
        let routes = Router::new().route(
            "/fail",
            get(|| async { Err::<(), _>(ApiError::internal("boom")) }),
        );

        let response = app_with(config, routes)
            .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["errors"]["message"], "boom");
        assert_eq!(body["errors"]["error"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_cors_headers_on_errors() {
        let app = app_with(base_config(), Router::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/missing")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_request_id_only_below_warn() {
        let routes = Router::new().route("/ok", get(|| async { "ok" }));

        let response = app_with(base_config(), routes.clone())
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));

        let mut config = base_config();
        config.logging.level = crate::config::LogLevel::Warn;
        let response = app_with(config, routes)
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_method_override_reaches_router() {
        let routes = Router::new().route("/articles/1", put(|| async { "updated" }));

        let response = app_with(base_config(), routes)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/articles/1")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("_method=PUT&title=x"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"updated");
    }

    #[tokio::test]
    async fn test_parsed_body_and_session_reach_handler() {
        let routes = Router::new().route(
            "/login",
            post(|session: Session, ParsedBody(body): ParsedBody| async move {
                session.insert("user", &body["user"]).unwrap();
                "ok"
            }),
        );

        let response = app_with(base_config(), routes)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"user":"jake"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("conduit.sid=s:"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let routes = Router::new().route("/articles", post(|| async { "created" }));

        let response = app_with(base_config(), routes)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/articles")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["errors"]["error"]["kind"], "bad_request");
    }

    #[tokio::test]
    async fn test_panic_becomes_verbose_500() {
        let routes = Router::new().route(
            "/panic",
            get(|| async {
                if true {
                    panic!("handler exploded");
                }
                "unreachable"
            }),
        );

        let response = app_with(base_config(), routes)
            .oneshot(Request::builder().uri("/panic").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        let stack = body["errors"]["error"]["stack"].as_str().unwrap();
        assert!(stack.contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_panic_in_production_is_sanitized_500() {
        let mut config = base_config();
        config.environment = crate::config::Environment::Production;
        let routes = Router::new().route(
            "/panic",
            get(|| async {
                if true {
                    panic!("kaboom");
                }
                "unreachable"
            }),
        );

        let response = app_with(config, routes)
            .oneshot(Request::builder().uri("/panic").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"errors": {"message": "Internal Server Error", "error": {}}})
        );
    }

    #[tokio::test]
    async fn test_wrong_method_is_not_found() {
        let mut config = base_config();
        config.environment = crate::config::Environment::Production;
        let routes = Router::new().route("/api/articles", get(|| async { "list" }));

        let response = app_with(config, routes)
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/articles")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"errors": {"message": "Not Found", "error": {}}})
        );
    }

    #[tokio::test]
    async fn test_preflight_is_no_content() {
        let response = app_with(base_config(), Router::new())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/articles")
                    .header(header::ORIGIN, "http://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
