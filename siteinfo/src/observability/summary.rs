//! One wide event per extraction.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::dispatcher::DispatchOutcome;

/// Everything worth knowing about a finished extraction, in one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionSummary {
    /// Request ID of the extraction.
    pub request_id: String,
    /// Target URL.
    pub url: String,
    /// Search depth.
    pub depth: u8,
    /// `completed`, or `partial` when a field degraded.
    pub status: &'static str,
    /// Resolved fields, sorted.
    pub fields: Vec<String>,
    /// Failure count per field.
    pub failure_counts: BTreeMap<String, usize>,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
}

impl ExtractionSummary {
    /// Builds the summary of a dispatch outcome.
    #[must_use]
    pub fn build(
        request_id: impl Into<String>,
        url: impl Into<String>,
        depth: u8,
        outcome: &DispatchOutcome,
        duration_ms: f64,
    ) -> Self {
        let mut failure_counts = BTreeMap::new();
        for failure in &outcome.failures {
            let field = failure
                .field
                .split_once('.')
                .map_or(failure.field.as_str(), |(field, _)| field);
            *failure_counts.entry(field.to_string()).or_insert(0) += 1;
        }

        Self {
            request_id: request_id.into(),
            url: url.into(),
            depth,
            status: if outcome.failures.is_empty() {
                "completed"
            } else {
                "partial"
            },
            fields: outcome.result.keys().map(ToString::to_string).collect(),
            failure_counts,
            duration_ms,
        }
    }

    /// Converts to a JSON payload.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Logs the summary at info level.
    pub fn emit(&self) {
        info!(
            request_id = %self.request_id,
            url = %self.url,
            status = self.status,
            fields = self.fields.len(),
            failures = self.failure_counts.values().sum::<usize>(),
            duration_ms = self.duration_ms,
            "Extraction finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::FieldKey;
    use crate::result::{FieldFailure, FieldValue};

    #[test]
    fn test_summary_counts_failures_per_field() {
        let mut outcome = DispatchOutcome::default();
        outcome.result.insert(FieldKey::PagesUrl, FieldValue::Empty);
        outcome.result.insert(FieldKey::Name, FieldValue::Text("Acme".into()));
        outcome.failures = vec![
            FieldFailure::new("pages_url.about", "timeout"),
            FieldFailure::new("pages_url.contact", "timeout"),
        ];

        let summary = ExtractionSummary::build("req-1", "https://acme.com/", 1, &outcome, 12.5);
        let payload = summary.to_payload();

        assert_eq!(payload["status"], "partial");
        assert_eq!(payload["fields"], serde_json::json!(["name", "pages_url"]));
        assert_eq!(payload["failure_counts"]["pages_url"], 2);
        assert_eq!(payload["duration_ms"], 12.5);
    }

    #[test]
    fn test_clean_run_is_completed() {
        let summary =
            ExtractionSummary::build("req-2", "https://acme.com/", 0, &DispatchOutcome::default(), 1.0);
        assert_eq!(summary.status, "completed");
        assert!(summary.failure_counts.is_empty());
    }
}
