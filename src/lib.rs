//! Client library for cross-browser screenshot jobs.
//!
//! Build and validate a [`ScreenshotRequest`], submit it with a
//! [`JobClient`], then follow the resulting job until it is done, either by
//! polling [`JobClient::is_finished`] yourself or with a [`JobWatcher`].

pub mod client;
pub mod config;
pub mod logging;
pub mod request;
pub mod watch;

pub use client::{
    BrowserCapability, ClientError, Credentials, HttpTransport, Job, JobClient, JobHandle,
    JobState, Screenshot, SimulatedTransport, Transport, TransportError,
};
pub use config::{ClientConfig, ConfigError, WatchConfig};
pub use request::{
    BrowserTarget, MacResolution, Orientation, Quality, RequestPayload, ScreenshotRequest,
    ValidationError, WindowsResolution,
};
pub use watch::{BackoffPolicy, JobWatcher, WatchError};
