//! Screenshot request model.
//!
//! A [`ScreenshotRequest`] is assembled field by field. Every setter checks
//! its input before touching the request, so a failed call leaves the
//! previous state intact. [`ScreenshotRequest::validate`] is the whole-document
//! gate and runs before serialization unless explicitly skipped.

mod browser;
mod error;
mod options;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use browser::{BROWSER_KEYS, BrowserTarget, REQUIRED_BROWSER_KEYS};
pub use error::ValidationError;
pub use options::{MacResolution, Orientation, Quality, WindowsResolution};

use options::{LOCAL_FIELD, coerce_bool, coerce_wait_time, render};

/// Top-level keys of a serialized request.
pub const REQUEST_KEYS: &[&str] = &[
    "url",
    "callback_url",
    "win_res",
    "mac_res",
    "quality",
    "wait_time",
    "orientation",
    "local",
    "browsers",
];

/// A cross-browser screenshot request under construction.
///
/// Deserializing this type directly skips the per-field checks; such values
/// are still caught by [`validate`](Self::validate) before serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenshotRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    callback_url: Option<String>,
    #[serde(rename = "win_res", default, skip_serializing_if = "Option::is_none")]
    windows_resolution: Option<WindowsResolution>,
    #[serde(rename = "mac_res", default, skip_serializing_if = "Option::is_none")]
    mac_resolution: Option<MacResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quality: Option<Quality>,
    #[serde(rename = "wait_time", default, skip_serializing_if = "Option::is_none")]
    wait_time_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    orientation: Option<Orientation>,
    #[serde(rename = "local", default, skip_serializing_if = "Option::is_none")]
    use_local_tunnel: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    browsers: Vec<BrowserTarget>,
}

impl ScreenshotRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a request from a previously serialized document.
    ///
    /// Every field goes through its checked setter, then the document is
    /// validated as a whole. Null values are treated as unset.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Same as [`from_json`](Self::from_json) for an already parsed document.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(ValidationError::Malformed(format!(
                    "expected a JSON object, found {}",
                    render(&other)
                )));
            }
        };

        let unknown: Vec<String> = fields
            .keys()
            .filter(|key| !REQUEST_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownField {
                fields: unknown,
                accepted: REQUEST_KEYS.iter().map(|k| k.to_string()).collect(),
            });
        }

        let mut request = Self::new();
        for (key, value) in fields {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "url" => {
                    request.set_url(string_value("url", &value)?);
                }
                "callback_url" => {
                    request.set_callback_url(string_value("callback_url", &value)?);
                }
                "win_res" => {
                    request.set_windows_resolution(&string_value("win_res", &value)?)?;
                }
                "mac_res" => {
                    request.set_mac_resolution(&string_value("mac_res", &value)?)?;
                }
                "quality" => {
                    request.set_quality(&string_value("quality", &value)?)?;
                }
                "wait_time" => {
                    request.set_wait_time_seconds(value)?;
                }
                "orientation" => {
                    request.set_orientation(&string_value("orientation", &value)?)?;
                }
                "local" => {
                    request.set_use_local_tunnel(value)?;
                }
                "browsers" => {
                    let targets = match value {
                        Value::Array(targets) => targets,
                        other => {
                            return Err(ValidationError::invalid(
                                "browsers",
                                &["a list of browser targets"],
                                render(&other),
                            ));
                        }
                    };
                    for target in targets {
                        request.add_browser_target(BrowserTarget::try_from(target)?)?;
                    }
                }
                // unknown keys were rejected above
                _ => {}
            }
        }

        request.validate()?;
        Ok(request)
    }

    /// Page to capture. Emptiness is only checked by [`validate`](Self::validate).
    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = Some(url.into());
        self
    }

    /// Address the service calls once the job completes. Stored verbatim.
    pub fn set_callback_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn set_windows_resolution(&mut self, value: &str) -> Result<&mut Self, ValidationError> {
        self.windows_resolution = Some(value.parse()?);
        Ok(self)
    }

    pub fn set_mac_resolution(&mut self, value: &str) -> Result<&mut Self, ValidationError> {
        self.mac_resolution = Some(value.parse()?);
        Ok(self)
    }

    pub fn set_quality(&mut self, value: &str) -> Result<&mut Self, ValidationError> {
        self.quality = Some(value.parse()?);
        Ok(self)
    }

    /// Seconds to wait before capturing. Accepts integers, floats and
    /// numeric strings; fractions are truncated.
    pub fn set_wait_time_seconds(
        &mut self,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ValidationError> {
        self.wait_time_seconds = Some(coerce_wait_time(&value.into())?);
        Ok(self)
    }

    pub fn set_orientation(&mut self, value: &str) -> Result<&mut Self, ValidationError> {
        self.orientation = Some(value.parse()?);
        Ok(self)
    }

    /// Route the capture through a previously established local tunnel.
    /// Only a real boolean is accepted.
    pub fn set_use_local_tunnel(
        &mut self,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ValidationError> {
        self.use_local_tunnel = Some(coerce_bool(LOCAL_FIELD, &value.into())?);
        Ok(self)
    }

    /// Validate `target` and append it. Insertion order is preserved.
    pub fn add_browser_target(
        &mut self,
        target: BrowserTarget,
    ) -> Result<&mut Self, ValidationError> {
        target.validate()?;
        self.browsers.push(target);
        Ok(self)
    }

    /// Append a target described as loose key/value options.
    pub fn add_browser_options(
        &mut self,
        options: &Map<String, Value>,
    ) -> Result<&mut Self, ValidationError> {
        let target = BrowserTarget::from_map(options)?;
        self.browsers.push(target);
        Ok(self)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.callback_url.as_deref()
    }

    pub fn windows_resolution(&self) -> Option<WindowsResolution> {
        self.windows_resolution
    }

    pub fn mac_resolution(&self) -> Option<MacResolution> {
        self.mac_resolution
    }

    pub fn quality(&self) -> Option<Quality> {
        self.quality
    }

    pub fn wait_time_seconds(&self) -> Option<i64> {
        self.wait_time_seconds
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    pub fn use_local_tunnel(&self) -> Option<bool> {
        self.use_local_tunnel
    }

    pub fn browsers(&self) -> &[BrowserTarget] {
        &self.browsers
    }

    /// Whole-document check: a non-empty url, at least one browser, and
    /// every browser target valid on its own.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::missing("url"));
        }
        if self.browsers.is_empty() {
            return Err(ValidationError::missing("browsers"));
        }
        self.browsers.iter().try_for_each(BrowserTarget::validate)
    }

    /// Validate, then serialize.
    pub fn to_payload(&self) -> Result<RequestPayload, ValidationError> {
        self.validate()?;
        self.to_payload_unchecked()
    }

    /// Serialize without the whole-document check.
    pub fn to_payload_unchecked(&self) -> Result<RequestPayload, ValidationError> {
        serde_json::to_string(self)
            .map(RequestPayload)
            .map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

fn string_value(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ValidationError::invalid(field, &["a string"], render(other))),
    }
}

/// Serialized form of a request, ready to be submitted. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload(String);

impl RequestPayload {
    /// Validate a raw document and wrap it for submission.
    pub fn parse(json: &str) -> Result<Self, ValidationError> {
        ScreenshotRequest::from_json(json)?.to_payload()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for RequestPayload {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
