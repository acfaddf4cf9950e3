//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

use octofit_api::config::AppConfig;
use octofit_api::http::{AppState, HttpServer};
use octofit_api::lifecycle::Shutdown;
use octofit_api::routing::RouteTable;

/// Build the app over `routes` with a fixed environment.
pub fn app_with(routes: RouteTable, env: &[(&str, &str)]) -> Router {
    let config = AppConfig::default();
    let env: Vec<(String, String)> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let state = AppState::new(Arc::new(routes), config.api.clone()).with_env(move |key| {
        env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    });
    HttpServer::build_router(&config, state)
}

/// The in-memory fitness app with an empty environment.
pub fn test_app() -> Router {
    app_with(RouteTable::in_memory("/api/").unwrap(), &[])
}

/// Send one request through the app.
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "testserver");
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Start a real server on an ephemeral port.
pub async fn spawn_server(config: AppConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, RouteTable::in_memory("/api/").unwrap());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}
