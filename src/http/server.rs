//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the root endpoint and resource dispatch
//! - Wire up middleware (tracing, timeout, request ID, metrics, headers)
//! - Dispatch requests through the route table to resource handlers
//! - Bind server to listener with graceful shutdown

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ApiConfig, AppConfig};
use crate::http::error::ApiError;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::root::{api_root, root_method_not_allowed};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::{metrics, tracing::request_span};
use crate::resources::ViewSet;
use crate::routing::{Action, Resolution, RouteTable};

/// Environment variable lookup, injectable for tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub api: Arc<ApiConfig>,
    pub env: EnvLookup,
}

impl AppState {
    /// State reading the process environment.
    pub fn new(routes: Arc<RouteTable>, api: ApiConfig) -> Self {
        Self {
            routes,
            api: Arc::new(api),
            env: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the environment lookup.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }
}

/// HTTP server for the OctoFit API.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `routes`.
    pub fn new(config: AppConfig, routes: RouteTable) -> Self {
        let state = AppState::new(Arc::new(routes), config.api.clone());
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &AppConfig, state: AppState) -> Router {
        let api_prefix = state.routes.api_prefix().to_string();

        let root = get(api_root).fallback(root_method_not_allowed);
        let mut router = Router::new().route("/", root.clone());
        if api_prefix != "/" {
            router = router.route(&api_prefix, root);
        }

        let router = router
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(metrics::track_requests));

        let router = if config.security.enable_headers {
            router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
        } else {
            router
        };

        router
            .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api_prefix = %self.config.api.prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resource dispatch handler.
/// Resolves the request against the route table and calls the matching action.
async fn dispatch_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request.request_id().unwrap_or("-").to_string();

    let (handler, action, id) = match state.routes.resolve(&method, &path) {
        Resolution::Matched {
            registration,
            action,
            id,
        } => {
            tracing::debug!(
                request_id = %request_id,
                resource = %registration.prefix(),
                action = %action,
                "Dispatching request"
            );
            (Arc::clone(registration.handler()), action, id)
        }
        Resolution::MethodNotAllowed { allowed } => {
            return Err(ApiError::MethodNotAllowed { method, allowed });
        }
        Resolution::NotFound => {
            if let Some(location) = append_slash_target(&state.routes, &method, request.uri()) {
                tracing::debug!(request_id = %request_id, location = %location, "Redirecting to slashed path");
                return Ok(redirect(&location));
            }
            tracing::debug!(request_id = %request_id, path = %path, "No route matched");
            return Err(ApiError::NotFound);
        }
    };

    let body = if matches!(action, Action::Create | Action::Update | Action::PartialUpdate) {
        read_json(request.into_body(), state.api.max_body_size).await?
    } else {
        Value::Null
    };

    invoke(handler.as_ref(), action, id.as_deref(), body).await
}

/// Run one action against a handler and shape the response.
async fn invoke(
    view: &dyn ViewSet,
    action: Action,
    id: Option<&str>,
    body: Value,
) -> Result<Response, ApiError> {
    let lookup = || id.ok_or(ApiError::NotFound);

    let response = match action {
        Action::List => Json(Value::Array(view.list().await?)).into_response(),
        Action::Create => (StatusCode::CREATED, Json(view.create(body).await?)).into_response(),
        Action::Retrieve => Json(view.retrieve(lookup()?).await?).into_response(),
        Action::Update => Json(view.update(lookup()?, body).await?).into_response(),
        Action::PartialUpdate => Json(view.partial_update(lookup()?, body).await?).into_response(),
        Action::Destroy => {
            view.destroy(lookup()?).await?;
            StatusCode::NO_CONTENT.into_response()
        }
    };
    Ok(response)
}

/// Buffer and parse a JSON request body. An empty body parses as `{}`.
async fn read_json(body: Body, limit: usize) -> Result<Value, ApiError> {
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        if e.into_inner().downcast_ref::<LengthLimitError>().is_some() {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::BadRequest("Could not read request body.".to_string())
        }
    })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("JSON parse error - {e}")))
}

/// Where a slash-less GET/HEAD should be redirected, if the slashed path exists.
fn append_slash_target(routes: &RouteTable, method: &Method, uri: &Uri) -> Option<String> {
    if *method != Method::GET && *method != Method::HEAD {
        return None;
    }

    let path = uri.path();
    if path.ends_with('/') {
        return None;
    }

    let slashed = format!("{path}/");
    let exists = slashed == routes.api_prefix()
        || matches!(routes.resolve(method, &slashed), Resolution::Matched { .. });
    if !exists {
        return None;
    }

    Some(match uri.query() {
        Some(query) => format!("{slashed}?{query}"),
        None => slashed,
    })
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => ApiError::NotFound.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    use crate::config::schema::TimeoutConfig;
    use crate::resources::Record;

    fn routes() -> RouteTable {
        RouteTable::in_memory("/api/").unwrap()
    }

    /// Never answers within a one-second timeout.
    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl ViewSet for Stalled {
        async fn list(&self) -> Result<Vec<Record>, ApiError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
        async fn create(&self, _body: Value) -> Result<Record, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn retrieve(&self, _id: &str) -> Result<Record, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn update(&self, _id: &str, _body: Value) -> Result<Record, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn partial_update(&self, _id: &str, _body: Value) -> Result<Record, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn destroy(&self, _id: &str) -> Result<(), ApiError> {
            Err(ApiError::NotFound)
        }
    }

    #[test]
    fn test_timed_out_requests_are_counted() {
        let config = AppConfig {
            timeouts: TimeoutConfig { request_secs: 1 },
            ..AppConfig::default()
        };
        let routes = RouteTable::fitness("/api/", |_| Arc::new(Stalled)).unwrap();
        let state = AppState::new(Arc::new(routes), config.api.clone());
        let app = HttpServer::build_router(&config, state);

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let status = ::metrics::with_local_recorder(&recorder, || {
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap()
                .block_on(async {
                    let req = Request::builder()
                        .uri("/api/users/")
                        .body(Body::empty())
                        .unwrap();
                    app.oneshot(req).await.unwrap().status()
                })
        });

        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        let rendered = handle.render();
        assert!(rendered.contains("octofit_requests_total"), "{rendered}");
        assert!(rendered.contains(r#"status="408""#), "{rendered}");
    }

    #[test]
    fn test_append_slash_target() {
        let routes = routes();
        let uri: Uri = "/api/users?page=2".parse().unwrap();
        assert_eq!(
            append_slash_target(&routes, &Method::GET, &uri),
            Some("/api/users/?page=2".to_string())
        );

        let root: Uri = "/api".parse().unwrap();
        assert_eq!(
            append_slash_target(&routes, &Method::HEAD, &root),
            Some("/api/".to_string())
        );
    }

    #[test]
    fn test_append_slash_only_for_safe_methods_and_known_paths() {
        let routes = routes();
        let uri: Uri = "/api/users".parse().unwrap();
        assert_eq!(append_slash_target(&routes, &Method::POST, &uri), None);

        let unknown: Uri = "/api/coaches".parse().unwrap();
        assert_eq!(append_slash_target(&routes, &Method::GET, &unknown), None);
    }

    #[tokio::test]
    async fn test_read_json_empty_body_is_empty_object() {
        let value = read_json(Body::from("  \n"), 1024).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_read_json_errors() {
        let err = read_json(Body::from("{not json"), 1024).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.starts_with("JSON parse error")));

        let err = read_json(Body::from(vec![b' '; 64]), 16).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { limit: 16 }));
    }
}
