//! API root discovery endpoint.
//!
//! `GET /api/` answers with one absolute URL per registered resource:
//!
//! ```text
//! {"users": "http://host/api/users/", "teams": "http://host/api/teams/", ...}
//! ```
//!
//! The base URL is resolved per request. Inside a Codespace (`CODESPACE_NAME`
//! set and non-empty) it points at the forwarded port on `app.github.dev`;
//! otherwise it is built from the request's own scheme and host.

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Uri};
use axum::Json;
use serde_json::{Map, Value};

use crate::config::ApiConfig;
use crate::http::error::ApiError;
use crate::http::server::AppState;

/// Environment variable naming the Codespace the process runs in.
pub const SANDBOX_ENV_VAR: &str = "CODESPACE_NAME";

/// Port the sandbox forwards to the public hostname.
pub const SANDBOX_PORT: u16 = 8000;

/// Domain hosting forwarded Codespace ports.
pub const SANDBOX_DOMAIN: &str = "app.github.dev";

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Scheme and host a request was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Derive the origin from request headers and URI.
    ///
    /// Precedence for the host: `X-Forwarded-Host` (when trusted), `Host`,
    /// the URI authority, then `api.default_host`. The scheme follows the same
    /// order with `X-Forwarded-Proto` and the URI scheme, defaulting to `http`.
    pub fn from_request(headers: &HeaderMap, uri: &Uri, api: &ApiConfig) -> Self {
        let forwarded = |name: &str| {
            api.trust_forwarded_headers
                .then(|| first_header_value(headers, name))
                .flatten()
        };

        let scheme = forwarded(X_FORWARDED_PROTO)
            .or_else(|| uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());

        let host = forwarded(X_FORWARDED_HOST)
            .or_else(|| first_header_value(headers, header::HOST.as_str()))
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_else(|| api.default_host.clone());

        Self { scheme, host }
    }

    /// Absolute URL for `path` on this origin.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }
}

/// First comma-separated value of a header, trimmed; `None` when blank.
fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve the base URL resource links are built on.
///
/// `env` looks up environment variables; pass `|k| std::env::var(k).ok()` for
/// the process environment. An empty `CODESPACE_NAME` counts as unset.
pub fn resolve_base_url<F>(env: F, origin: &RequestOrigin, api_prefix: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match env(SANDBOX_ENV_VAR).filter(|name| !name.is_empty()) {
        Some(codespace) => format!(
            "https://{codespace}-{SANDBOX_PORT}.{SANDBOX_DOMAIN}{api_prefix}"
        ),
        None => origin.absolute(api_prefix),
    }
}

/// Build the `{name: url}` discovery document.
pub fn discovery_document<'a>(
    base_url: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Map<String, Value> {
    names
        .into_iter()
        .map(|name| (name.to_string(), Value::String(format!("{base_url}{name}/"))))
        .collect()
}

/// `GET /api/` (also mounted at `/`).
pub async fn api_root(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Json<Map<String, Value>> {
    let origin = RequestOrigin::from_request(&headers, &uri, &state.api);
    let base_url = resolve_base_url(|key| (state.env)(key), &origin, state.routes.api_prefix());

    tracing::debug!(base_url = %base_url, "Serving API root");
    Json(discovery_document(&base_url, state.routes.names()))
}

/// Any method other than GET/HEAD on the root.
pub async fn root_method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        allowed: vec![Method::GET, Method::HEAD],
    }
}
