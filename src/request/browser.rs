//! Browser targets: one OS / browser / device combination per capture.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ValidationError;
use super::options::render;

/// Every key a browser target may carry.
pub const BROWSER_KEYS: &[&str] = &["os", "os_version", "browser", "browser_version", "device"];

/// Keys every browser target must carry.
pub const REQUIRED_BROWSER_KEYS: &[&str] = &["os", "os_version"];

/// A single capture target.
///
/// Either `device` (mobile captures) or `browser_version` (desktop captures)
/// must be given, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserTarget {
    /// e.g. "Windows", "OS X", "ios", "android"
    pub os: String,
    /// e.g. "7", "8.1", "Mavericks"
    pub os_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl BrowserTarget {
    pub fn new(os: impl Into<String>, os_version: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            os_version: os_version.into(),
            browser: None,
            browser_version: None,
            device: None,
        }
    }

    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = Some(browser.into());
        self
    }

    pub fn with_browser_version(mut self, version: impl Into<String>) -> Self {
        self.browser_version = Some(version.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Check required keys and the device / browser_version discriminator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing: Vec<String> = [("os", &self.os), ("os_version", &self.os_version)]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequiredField { fields: missing });
        }

        if is_blank(&self.device) && is_blank(&self.browser_version) {
            return Err(ValidationError::ConflictingOptions);
        }

        Ok(())
    }

    /// Build a target from a loosely-typed key/value description.
    ///
    /// Unknown keys are reported first, then missing required keys, then
    /// the discriminator check. Null values count as absent.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        let unknown: Vec<String> = map
            .keys()
            .filter(|key| !BROWSER_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownField {
                fields: unknown,
                accepted: BROWSER_KEYS.iter().map(|k| k.to_string()).collect(),
            });
        }

        let missing: Vec<String> = REQUIRED_BROWSER_KEYS
            .iter()
            .filter(|key| map.get(**key).is_none_or(Value::is_null))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequiredField { fields: missing });
        }

        let target = Self {
            os: text_field(map, "os")?.unwrap_or_default(),
            os_version: text_field(map, "os_version")?.unwrap_or_default(),
            browser: text_field(map, "browser")?,
            browser_version: text_field(map, "browser_version")?,
            device: text_field(map, "device")?,
        };
        target.validate()?;
        Ok(target)
    }
}

impl TryFrom<&Map<String, Value>> for BrowserTarget {
    type Error = ValidationError;

    fn try_from(map: &Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

impl TryFrom<Value> for BrowserTarget {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Self::from_map(&map),
            other => Err(ValidationError::invalid(
                "browsers",
                &["an object of browser options"],
                render(&other),
            )),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

/// Versions are often written as bare numbers; keep their text form.
fn text_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>, ValidationError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(ValidationError::invalid(
            key,
            &["a string", "a number"],
            render(other),
        )),
    }
}
