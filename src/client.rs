//! HTTP client for the OctoFit API.

use reqwest::{Client, Response};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::http::root::{SANDBOX_DOMAIN, SANDBOX_ENV_VAR, SANDBOX_PORT};

/// Backend used when neither an explicit URL nor a Codespace is available.
pub const LOCAL_BACKEND: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Pick the backend origin: the Codespace forward when `CODESPACE_NAME` is set,
/// otherwise the local development server.
pub fn backend_url<F>(env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match env(SANDBOX_ENV_VAR).filter(|name| !name.is_empty()) {
        Some(codespace) => format!("https://{codespace}-{SANDBOX_PORT}.{SANDBOX_DOMAIN}"),
        None => LOCAL_BACKEND.to_string(),
    }
}

/// Records from a list response, paginated (`{"results": [...]}`) or plain.
pub fn records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

pub struct ApiClient {
    client: Client,
    api_base: Url,
}

impl ApiClient {
    /// Client for the API served under `<backend>/api/`.
    pub fn new(backend: &str) -> Result<Self, ClientError> {
        Self::with_client(backend, Client::new())
    }

    pub fn with_client(backend: &str, client: Client) -> Result<Self, ClientError> {
        let mut backend = backend.to_string();
        if !backend.ends_with('/') {
            backend.push('/');
        }
        let api_base = Url::parse(&backend)?.join("api/")?;
        Ok(Self { client, api_base })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// `<api>/<resource>/` or `<api>/<resource>/<id>/`.
    pub fn resource_url(&self, resource: &str, id: Option<&str>) -> Result<Url, ClientError> {
        let collection = self.api_base.join(&format!("{resource}/"))?;
        match id {
            Some(id) => Ok(collection.join(&format!("{id}/"))?),
            None => Ok(collection),
        }
    }

    /// Fetch the discovery document.
    pub async fn root(&self) -> Result<Map<String, Value>, ClientError> {
        let resp = self.client.get(self.api_base.clone()).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn list(&self, resource: &str) -> Result<Vec<Value>, ClientError> {
        let url = self.resource_url(resource, None)?;
        tracing::debug!(url = %url, "Fetching {}", resource);
        let resp = self.client.get(url).send().await?;
        Ok(records(check(resp).await?.json().await?))
    }

    pub async fn get(&self, resource: &str, id: &str) -> Result<Value, ClientError> {
        let resp = self
            .client
            .get(self.resource_url(resource, Some(id))?)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn create(&self, resource: &str, body: &Value) -> Result<Value, ClientError> {
        let resp = self
            .client
            .post(self.resource_url(resource, None)?)
            .json(body)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn delete(&self, resource: &str, id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.resource_url(resource, Some(id))?)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}
