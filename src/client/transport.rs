//! Transport capability used by [`JobClient`](super::JobClient).
//!
//! The client only needs two verbs: fetch a JSON document and post a JSON
//! document. Connection handling, TLS and the basic-auth header all live
//! behind this seam. No retries happen here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::Credentials;

/// Failures talking to the remote service, passed to the caller as-is.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Service response was not valid JSON: {0}")]
    InvalidBody(String),
}

/// Authenticated JSON request/response against the screenshot service.
///
/// Paths are relative to the service base; an empty path addresses the
/// base itself.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<Value, TransportError>;

    async fn post_json(
        &self,
        path: &str,
        body: &str,
        credentials: &Credentials,
    ) -> Result<Value, TransportError>;
}

/// [`Transport`] over HTTPS using `reqwest`.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, TransportError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Screenshot service returned an error");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::InvalidBody(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        debug!(method = "GET", url = %url, "Calling screenshot service");

        let request = self
            .client
            .get(&url)
            .basic_auth(credentials.username(), Some(credentials.access_key()));
        self.send(request).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &str,
        credentials: &Credentials,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        debug!(method = "POST", url = %url, bytes = body.len(), "Calling screenshot service");

        let request = self
            .client
            .post(&url)
            .basic_auth(credentials.username(), Some(credentials.access_key()))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());
        self.send(request).await
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
