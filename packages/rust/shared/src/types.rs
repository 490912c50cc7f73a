//! Core domain types and constants for histmerge.

use serde::{Deserialize, Serialize};

/// The template whose talk-page transclusions form the work queue.
pub const RECORD_TEMPLATE: &str = "Template:Article history";

/// Tags of the redundant banners this bot merges away, as they appear after
/// an opening `{{` (lowercased). Used by the work-queue pre-check; the
/// engine's extractors carry their own (slightly more lenient) matchers.
pub const SOURCE_TEMPLATE_TAGS: [&str; 3] = ["itn talk", "on this day", "dyk talk"];

// ---------------------------------------------------------------------------
// ResumeToken
// ---------------------------------------------------------------------------

/// Opaque continuation token for the transclusion work queue.
///
/// The API hands one back when a listing page is truncated; passing it into
/// the next listing call resumes where the previous run stopped. Callers own
/// the token — there is no process-wide checkpoint state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(pub String);

impl ResumeToken {
    /// Wrap a raw continuation value from the API.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw continuation value to send back to the API.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ResumeToken {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}
