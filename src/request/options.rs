//! Display options accepted by the screenshot service.
//!
//! The enumerated options parse from their wire text and reject anything
//! else with [`ValidationError::InvalidFieldValue`]. Wait time and the local
//! tunnel flag take loosely-typed JSON input and coerce it the way the
//! service's form handling does.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ValidationError;

macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Wire key of the option this type describes.
            pub const FIELD: &'static str = $field;
            /// Every value the service accepts, in its documented order.
            pub const ACCEPTED: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ValidationError::invalid($field, Self::ACCEPTED, other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_enum! {
    /// Screen resolution used for Windows captures.
    WindowsResolution, field = "win_res" {
        R1024x768 => "1024x768",
        R1280x1024 => "1280x1024",
    }
}

option_enum! {
    /// Screen resolution used for OS X captures.
    MacResolution, field = "mac_res" {
        R1024x768 => "1024x768",
        R1280x960 => "1280x960",
        R1280x1024 => "1280x1024",
        R1600x1200 => "1600x1200",
        R1920x1080 => "1920x1080",
    }
}

option_enum! {
    Quality, field = "quality" {
        Original => "original",
        Compressed => "compressed",
    }
}

option_enum! {
    /// Device orientation for mobile captures.
    Orientation, field = "orientation" {
        Portrait => "portrait",
        Landscape => "landscape",
    }
}

pub(crate) const WAIT_TIME_FIELD: &str = "wait_time";
pub(crate) const LOCAL_FIELD: &str = "local";

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?\s*$")
        .expect("numeric pattern is valid")
});

/// Coerce a numeric-looking value to whole seconds, truncating any fraction.
///
/// Integers, floats and decimal strings (optionally signed, with an
/// exponent, surrounded by whitespace) are accepted. Booleans, null and
/// anything else are rejected.
pub(crate) fn coerce_wait_time(value: &Value) -> Result<i64, ValidationError> {
    let reject = || ValidationError::invalid(WAIT_TIME_FIELD, &["a number of seconds"], render(value));

    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(reject),
        Value::String(s) if NUMERIC.is_match(s) => {
            let s = s.trim();
            if let Ok(whole) = s.parse::<i64>() {
                return Ok(whole);
            }
            s.parse::<f64>()
                .map(|f| f.trunc() as i64)
                .map_err(|_| reject())
        }
        _ => Err(reject()),
    }
}

/// Accept only a real boolean; strings such as `"true"` or `1` are rejected.
pub(crate) fn coerce_bool(field: &str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(ValidationError::invalid(field, &["true", "false"], render(other))),
    }
}

/// Text form of a value for error messages; strings are shown unquoted.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
