//! Caller-side job watching.
//!
//! [`JobWatcher`] follows one job id on an exponential backoff schedule until
//! the job is done or reports an error state. It owns no shared state; run
//! one watcher per job and cancel it through the token you hand in.

use std::future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientError, Job, JobClient, JobState};
use crate::config::WatchConfig;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(
        "Job {job_id} did not finish within {timeout:?} (last state: {})",
        .last_state.as_ref().map_or("none observed", JobState::as_str)
    )]
    TimedOut {
        job_id: String,
        timeout: Duration,
        /// State from the most recent completed poll, if any finished in time.
        last_state: Option<JobState>,
    },

    #[error("Watching job {job_id} was cancelled")]
    Cancelled { job_id: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Shortest delay ever returned by [`BackoffPolicy::delays`].
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Delay schedule between polls.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    /// Growth factor per poll; values below 1.0 are treated as 1.0.
    pub multiplier: f64,
    pub timeout: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::from(&WatchConfig::default())
    }
}

impl From<&WatchConfig> for BackoffPolicy {
    fn from(config: &WatchConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_interval_ms),
            max: Duration::from_millis(config.max_interval_ms),
            multiplier: config.multiplier,
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl BackoffPolicy {
    /// Endless sequence of delays, growing until capped at `max`. Never
    /// shorter than [`MIN_INTERVAL`], whatever the configured values.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let max = self.max.max(MIN_INTERVAL);
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            1.0
        };

        let initial = self.initial.max(MIN_INTERVAL).min(max);
        std::iter::successors(Some(initial), move |previous| {
            let next = Duration::try_from_secs_f64(previous.as_secs_f64() * multiplier)
                .unwrap_or(max);
            Some(next.min(max))
        })
    }
}

pub struct JobWatcher {
    client: JobClient,
    policy: BackoffPolicy,
}

impl JobWatcher {
    pub fn new(client: JobClient, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Poll `job_id` until it is done or reports an error state, and return
    /// that snapshot. Client errors end the watch immediately.
    pub async fn watch(&self, job_id: &str, cancel: &CancellationToken) -> Result<Job, WatchError> {
        let deadline = self.policy.timeout.map(|timeout| Instant::now() + timeout);
        let mut delays = self.policy.delays();
        let cancelled = || WatchError::Cancelled {
            job_id: job_id.to_string(),
        };
        let timed_out = |last_state: Option<JobState>| WatchError::TimedOut {
            job_id: job_id.to_string(),
            timeout: self.policy.timeout.unwrap_or_default(),
            last_state,
        };
        let mut last_state: Option<JobState> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = reached(deadline) => return Err(timed_out(last_state)),
                polled = self.client.get_job_info(job_id) => polled?,
            };

            let (completed, total) = job.progress();
            debug!(job_id = %job_id, state = %job.state, completed, total, "Polled screenshot job");

            if job.state.is_done() {
                info!(job_id = %job_id, total, "Screenshot job finished");
                return Ok(job);
            }
            if job.state.is_error() {
                warn!(job_id = %job_id, state = %job.state, "Screenshot job ended in an error state");
                return Ok(job);
            }

            last_state = Some(job.state);

            let mut delay = delays.next().unwrap_or(self.policy.max);
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(timed_out(last_state));
                }
                delay = delay.min(remaining);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Resolves at `deadline`, or never when there is none.
async fn reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
