//! Error types for histmerge.
//!
//! Library crates use [`HistmergeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all histmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum HistmergeError {
    /// A template parameter segment lacks a key/value separator.
    /// Fatal to the current document; no partial output is produced.
    #[error("malformed parameter segment: {segment:?}")]
    MalformedParameter { segment: String },

    /// A source template was located without a field it must carry.
    #[error("source template is missing its mandatory {field:?} field")]
    MissingMandatoryField { field: String },

    /// A date string could not be interpreted by the flexible date parser.
    #[error("unparseable date: {input:?}")]
    DateParse { input: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the wiki API.
    #[error("network error: {0}")]
    Network(String),

    /// The wiki API answered, but with an error or an unexpected shape.
    #[error("API error: {message}")]
    Api { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HistmergeError>;

impl HistmergeError {
    /// Create a malformed-parameter error for the offending segment.
    pub fn malformed(segment: impl Into<String>) -> Self {
        Self::MalformedParameter {
            segment: segment.into(),
        }
    }

    /// Create a missing-mandatory-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingMandatoryField {
            field: field.into(),
        }
    }

    /// Create a date-parse error carrying the rejected input.
    pub fn date_parse(input: impl Into<String>) -> Self {
        Self::DateParse {
            input: input.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an API error from any displayable message.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = HistmergeError::malformed("itndate");
        assert_eq!(err.to_string(), "malformed parameter segment: \"itndate\"");

        let err = HistmergeError::missing_field("entry");
        assert!(err.to_string().contains("entry"));

        let err = HistmergeError::date_parse("the 5th of Junetober");
        assert!(err.to_string().contains("Junetober"));
    }
}
