use thiserror::Error;

/// Reasons a screenshot request (or one of its browser targets) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required keys were absent or empty.
    #[error("The following required options were omitted: {}", .fields.join(", "))]
    MissingRequiredField { fields: Vec<String> },

    /// A value outside the accepted set, or of the wrong primitive kind.
    #[error("{field} must be {}; {given} given.", describe_accepted(.accepted))]
    InvalidFieldValue {
        field: String,
        accepted: Vec<String>,
        given: String,
    },

    /// Keys that are not part of the accepted set.
    #[error(
        "Invalid option(s) {} were given. Valid options are {}",
        .fields.join(", "),
        .accepted.join(", ")
    )]
    UnknownField {
        fields: Vec<String>,
        accepted: Vec<String>,
    },

    /// A browser target that names neither a device nor a browser version.
    #[error("For each browser, either a device or a browser_version must be specified.")]
    ConflictingOptions,

    /// The input could not be parsed as a request document at all.
    #[error("Malformed request document: {0}")]
    Malformed(String),
}

impl ValidationError {
    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingRequiredField {
            fields: vec![field.to_string()],
        }
    }

    pub(crate) fn invalid(field: &str, accepted: &[&str], given: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.to_string(),
            accepted: accepted.iter().map(|s| s.to_string()).collect(),
            given: given.into(),
        }
    }
}

fn describe_accepted(accepted: &[String]) -> String {
    match accepted {
        [] => "a valid value".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    }
}
