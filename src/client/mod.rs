//! Client for the remote screenshot job service.
//!
//! Every operation is one authenticated request/response through a
//! [`Transport`]. Nothing is cached and nothing is retried; polling and
//! backoff belong to the caller (see [`crate::watch`]).

mod credentials;
mod models;
pub mod simulated;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::request::{RequestPayload, ScreenshotRequest, ValidationError};

pub use credentials::Credentials;
pub use models::{BrowserCapability, Job, JobHandle, JobState, Screenshot};
pub use simulated::SimulatedTransport;
pub use transport::{HttpTransport, Transport, TransportError};

pub const DEFAULT_BASE_URL: &str = "https://www.browserstack.com/screenshots";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const BROWSERS_PATH: &str = "browsers.json";
const SUBMIT_PATH: &str = "";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Username and access key are both required")]
    InvalidCredentials,

    #[error("Invalid screenshot request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid job id '{job_id}': must be non-empty and contain no path separators")]
    InvalidJobId { job_id: String },

    #[error("Unexpected response for '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Submits screenshot jobs and observes their lifecycle.
#[derive(Clone)]
pub struct JobClient {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl JobClient {
    /// Client for the public service endpoint with default HTTP settings.
    pub fn new(
        username: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let credentials = Credentials::new(username, access_key)?;
        let transport = HttpTransport::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)?;
        Ok(Self::with_transport(credentials, transport))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let credentials = config.credentials()?;
        let transport = HttpTransport::new(
            config.base_url.clone(),
            config.request_timeout(),
            &config.user_agent,
        )?;
        Ok(Self::with_transport(credentials, transport))
    }

    pub fn with_transport(credentials: Credentials, transport: impl Transport + 'static) -> Self {
        Self {
            credentials,
            transport: Arc::new(transport),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// OS / browser combinations the service currently supports.
    pub async fn list_supported_browsers(&self) -> Result<Vec<BrowserCapability>, ClientError> {
        let value = self.transport.get_json(BROWSERS_PATH, &self.credentials).await?;
        let capabilities: Vec<BrowserCapability> = decode(BROWSERS_PATH, value)?;
        debug!(count = capabilities.len(), "Fetched supported browsers");
        Ok(capabilities)
    }

    /// Send an already validated request and return the service's answer.
    pub async fn submit(&self, payload: &RequestPayload) -> Result<JobHandle, ClientError> {
        let value = self
            .transport
            .post_json(SUBMIT_PATH, payload.as_str(), &self.credentials)
            .await?;
        let handle: JobHandle = decode("submit", value)?;
        info!(job_id = %handle.job_id, targets = handle.screenshots.len(), "Screenshot job submitted");
        Ok(handle)
    }

    /// Validate and serialize `request`, then submit it.
    pub async fn submit_request(
        &self,
        request: &ScreenshotRequest,
    ) -> Result<JobHandle, ClientError> {
        let payload = request.to_payload()?;
        self.submit(&payload).await
    }

    /// Full current snapshot of a job, including partial results.
    pub async fn get_job_info(&self, job_id: &str) -> Result<Job, ClientError> {
        let path = job_path(job_id)?;
        let value = self.transport.get_json(&path, &self.credentials).await?;
        decode(&path, value)
    }

    pub async fn get_status(&self, job_id: &str) -> Result<JobState, ClientError> {
        Ok(self.get_job_info(job_id).await?.state)
    }

    /// True only once the job reports `done`. Error states read as not
    /// finished; inspect [`get_status`](Self::get_status) to tell them apart.
    pub async fn is_finished(&self, job_id: &str) -> Result<bool, ClientError> {
        Ok(self.get_status(job_id).await?.is_done())
    }
}

/// Job ids become a single path segment under the service base.
fn job_path(job_id: &str) -> Result<String, ClientError> {
    if job_id.trim().is_empty() || job_id.contains(['/', '\\']) {
        return Err(ClientError::InvalidJobId {
            job_id: job_id.to_string(),
        });
    }
    Ok(format!("{job_id}.json"))
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|source| ClientError::Decode {
        path: path.to_string(),
        source,
    })
}
