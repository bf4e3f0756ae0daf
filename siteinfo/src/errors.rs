//! Error types for siteinfo.
//!
//! Request validation problems are collected into an itemized
//! [`RequestValidationError`] before any page is fetched. Failures while
//! resolving a single field are [`ExtractionError`]s and never abort the
//! whole request; the dispatcher degrades that field and records it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for siteinfo operations.
#[derive(Debug, Error)]
pub enum SiteInfoError {
    /// The request body or info-request spec failed validation.
    #[error("{0}")]
    Validation(#[from] RequestValidationError),

    /// An extractor produced a value that does not fit the response schema.
    #[error("{0}")]
    ResultShape(#[from] ResultShapeError),

    /// The page content provider failed.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The email verification collaborator failed.
    #[error("{0}")]
    Verification(#[from] VerificationError),

    /// The request was cancelled.
    #[error("Extraction cancelled: {0}")]
    Cancelled(String),

    /// The extraction exceeded its time budget.
    #[error("Extraction timed out after {seconds}s")]
    Timeout {
        /// The timeout that elapsed.
        seconds: f64,
    },

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SiteInfoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A single problem found while validating a request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending field (e.g. `info_request.foo`).
    pub field: String,
    /// Error code (e.g. `INFO-REQUEST-UNKNOWN-KEY`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Hint for fixing the problem.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ValidationIssue {
    /// Creates a new issue. The fix hint defaults to the suggestion for `code`.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let code = code.into();
        Self {
            field: field.into(),
            fix_hint: ValidationSuggestions::get(&code).map(str::to_string),
            code,
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("field".to_string(), serde_json::json!(self.field));
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Error raised when a request fails validation.
///
/// Carries every issue found, not just the first one.
#[derive(Debug, Clone, Error, Default, PartialEq, Eq)]
#[error("Invalid request: {}", summarize(.issues))]
pub struct RequestValidationError {
    /// All issues found.
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl RequestValidationError {
    /// Creates an empty error to accumulate issues into.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error with a single issue.
    #[must_use]
    pub fn single(issue: ValidationIssue) -> Self {
        Self { issues: vec![issue] }
    }

    /// Adds an issue.
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Moves all issues from another error into this one.
    pub fn merge(&mut self, other: Self) {
        self.issues.extend(other.issues);
    }

    /// Whether no issues were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `Ok(value)` if no issues were recorded, `Err(self)` otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Returns the offending field paths.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }

    /// Whether any issue references the given field path.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert(
            "issues".to_string(),
            serde_json::Value::Array(
                self.issues
                    .iter()
                    .map(|i| {
                        serde_json::Value::Object(i.to_dict().into_iter().collect())
                    })
                    .collect(),
            ),
        );
        map
    }
}

/// Error raised when an extraction result does not fit the response schema.
///
/// This indicates an extractor bug, not a caller mistake.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid result for `{field}`: {message}")]
pub struct ResultShapeError {
    /// The offending result key.
    pub field: String,
    /// What was wrong.
    pub message: String,
}

impl ResultShapeError {
    /// Creates a new result shape error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by a page content provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The URL could not be parsed or is not http(s).
    #[error("Invalid url `{url}`: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch {
        /// The URL being fetched.
        url: String,
        /// The underlying failure.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("Fetching {url} returned HTTP {status}")]
    HttpStatus {
        /// The URL being fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body exceeded the configured maximum.
    #[error("Response from {url} is too large ({size} bytes, max {max})")]
    TooLarge {
        /// The URL being fetched.
        url: String,
        /// The reported or observed size.
        size: usize,
        /// The configured maximum.
        max: usize,
    },
}

impl ProviderError {
    /// Creates an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a fetch error.
    #[must_use]
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the fetch could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidUrl { .. } | Self::TooLarge { .. } => false,
        }
    }
}

/// Errors raised by an email verification collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// The value does not look like an email address.
    #[error("`{0}` is not a valid email address")]
    InvalidAddress(String),

    /// The verification service could not be reached.
    #[error("Verification request failed: {0}")]
    Transport(String),

    /// The verification service answered with a non-success status.
    #[error("Verification service returned HTTP {0}")]
    Status(u16),

    /// The verification service answered with an unexpected body.
    #[error("Malformed verification response: {0}")]
    Malformed(String),
}

/// Errors raised while resolving a single field or sub-lookup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    /// The page content provider failed.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The request was cancelled before the lookup finished.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The lookup exceeded its time budget.
    #[error("Timed out after {seconds}s")]
    Timeout {
        /// The timeout that elapsed.
        seconds: f64,
    },

    /// The lookup task panicked or was aborted.
    #[error("Sub-lookup aborted: {0}")]
    Aborted(String),
}

impl From<ExtractionError> for SiteInfoError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Provider(e) => Self::Provider(e),
            ExtractionError::Cancelled(reason) => Self::Cancelled(reason),
            ExtractionError::Timeout { seconds } => Self::Timeout { seconds },
            ExtractionError::Aborted(reason) => Self::Internal(reason),
        }
    }
}

/// Provides default suggestions for validation error codes.
pub struct ValidationSuggestions;

impl ValidationSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            codes::UNKNOWN_KEY => Some(
                "Only keys from the info-request template are accepted. \
                 Fetch the template to see the allowed keys.",
            ),
            codes::UNKNOWN_SUBKEY => Some("Choice-set objects accept only `all` and `choices`."),
            codes::WRONG_TYPE => Some(
                "Flags must be booleans, page lists must be arrays of strings \
                 and choice-sets must be `{\"all\": bool, \"choices\": [string]}`.",
            ),
            codes::NOT_OBJECT => Some("Send the info request as a JSON object."),
            codes::MISSING_FIELD => Some("Add the field to the request body."),
            codes::INVALID_URL => Some("Use an absolute http:// or https:// url."),
            codes::DEPTH_RANGE => Some("Use a search depth between 0 and 2."),
            _ => None,
        }
    }
}

/// Validation error codes.
pub mod codes {
    /// An info-request key outside the whitelist.
    pub const UNKNOWN_KEY: &str = "INFO-REQUEST-UNKNOWN-KEY";
    /// A choice-set sub-key other than `all`/`choices`.
    pub const UNKNOWN_SUBKEY: &str = "INFO-REQUEST-UNKNOWN-SUBKEY";
    /// A value whose shape does not match the template.
    pub const WRONG_TYPE: &str = "INFO-REQUEST-WRONG-TYPE";
    /// The info request is not a JSON object.
    pub const NOT_OBJECT: &str = "INFO-REQUEST-NOT-OBJECT";
    /// A required top-level field is missing or empty.
    pub const MISSING_FIELD: &str = "REQUEST-MISSING-FIELD";
    /// The target url is malformed.
    pub const INVALID_URL: &str = "REQUEST-INVALID-URL";
    /// The search depth is out of range or not an integer.
    pub const DEPTH_RANGE: &str = "REQUEST-DEPTH-RANGE";
}
