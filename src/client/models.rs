//! Documents returned by the screenshot service.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::BrowserTarget;

/// Timestamp layout used by the service, e.g. `2013-03-14 16:25:45 UTC`.
const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Lifecycle state of a job or of a single screenshot within it.
///
/// The set is open: states this crate does not know about are kept
/// verbatim in [`JobState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Queued,
    QueuedAll,
    Pending,
    Processing,
    Done,
    Error,
    TimedOut,
    Other(String),
}

impl JobState {
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Queued => "queued",
            JobState::QueuedAll => "queued_all",
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Done => "done",
            JobState::Error => "error",
            JobState::TimedOut => "timed-out",
            JobState::Other(raw) => raw,
        }
    }

    /// The only success terminal.
    pub fn is_done(&self) -> bool {
        matches!(self, JobState::Done)
    }

    /// States the service uses to report a failed capture.
    pub fn is_error(&self) -> bool {
        matches!(self, JobState::Error | JobState::TimedOut)
    }
}

impl From<String> for JobState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "queued" => JobState::Queued,
            "queued_all" => JobState::QueuedAll,
            "pending" => JobState::Pending,
            "processing" => JobState::Processing,
            "done" => JobState::Done,
            "error" => JobState::Error,
            "timed-out" => JobState::TimedOut,
            _ => JobState::Other(raw),
        }
    }
}

impl From<&str> for JobState {
    fn from(raw: &str) -> Self {
        JobState::from(raw.to_string())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One capture within a job, filled in as the target completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub browser_version: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    /// Page that was captured.
    #[serde(default)]
    pub url: Option<String>,
    pub state: JobState,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumb_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Screenshot {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        NaiveDateTime::parse_from_str(raw, CREATED_AT_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Server-side snapshot of a screenshot job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub state: JobState,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub win_res: Option<String>,
    #[serde(default)]
    pub mac_res: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub wait_time: Option<i64>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
}

impl Job {
    pub fn is_finished(&self) -> bool {
        self.state.is_done()
    }

    pub fn completed_screenshots(&self) -> impl Iterator<Item = &Screenshot> {
        self.screenshots.iter().filter(|s| s.state.is_done())
    }

    /// Completed and total capture counts.
    pub fn progress(&self) -> (usize, usize) {
        (self.completed_screenshots().count(), self.screenshots.len())
    }
}

/// What the service answers to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    #[serde(alias = "id")]
    pub job_id: String,
    #[serde(default)]
    pub state: Option<JobState>,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
    /// Everything else the service echoed back.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An OS / browser combination the service currently supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCapability {
    pub os: String,
    pub os_version: String,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub browser_version: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

impl From<&BrowserCapability> for BrowserTarget {
    fn from(capability: &BrowserCapability) -> Self {
        BrowserTarget {
            os: capability.os.clone(),
            os_version: capability.os_version.clone(),
            browser: capability.browser.clone(),
            browser_version: capability.browser_version.clone(),
            device: capability.device.clone(),
        }
    }
}
