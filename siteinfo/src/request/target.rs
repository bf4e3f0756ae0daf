//! The site an extraction runs against.

use serde::Serialize;

use crate::errors::{codes, RequestValidationError, ValidationIssue};
use crate::provider::parse_http_url;

/// Deepest link-following distance a request may ask for.
pub const MAX_SEARCH_DEPTH: u8 = 2;

/// The URL and search depth of one extraction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionTarget {
    url: String,
    depth: u8,
}

impl ExtractionTarget {
    /// Validates and creates a target.
    ///
    /// A URL without a scheme is taken as `http://`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL with a
    /// host, or if `depth` exceeds [`MAX_SEARCH_DEPTH`].
    pub fn new(url: impl Into<String>, depth: u8) -> Result<Self, RequestValidationError> {
        let url = normalize_url(&url.into());
        let mut errors = RequestValidationError::new();

        if let Err(issue) = check_url(&url) {
            errors.push(issue);
        }
        if depth > MAX_SEARCH_DEPTH {
            errors.push(depth_issue(&depth.to_string()));
        }

        errors.into_result(Self { url, depth })
    }

    /// The target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Maximum link hops followed from the URL.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }
}

/// Trims a URL and prefixes `http://` when it names no scheme.
#[must_use]
pub(crate) fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

pub(crate) fn check_url(url: &str) -> Result<(), ValidationIssue> {
    let invalid = |reason: String| {
        ValidationIssue::new(
            "web_url",
            codes::INVALID_URL,
            format!("`web_url` is not a valid url: {reason}"),
        )
        .with_context_entry("value", url)
    };

    let parsed = parse_http_url(&normalize_url(url)).map_err(|e| invalid(e.to_string()))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

pub(crate) fn depth_issue(value: &str) -> ValidationIssue {
    ValidationIssue::new(
        "max_search_depth",
        codes::DEPTH_RANGE,
        format!("`max_search_depth` must be an integer between 0 and {MAX_SEARCH_DEPTH}"),
    )
    .with_context_entry("value", value)
}
