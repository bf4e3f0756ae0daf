//! Request parsing and validation.
//!
//! A request body carries `web_url`, an optional `max_search_depth` and the
//! `info_request` naming the fields to extract. Validation runs before any
//! page is fetched and reports every problem it finds.

mod schema;
mod target;

use serde::Serialize;
use serde_json::Value;

use crate::errors::{codes, RequestValidationError, ValidationIssue};

pub use schema::{
    ChoiceSet, FieldKey, FieldRequest, InfoRequestSpec, Invocation, RequestShape, ResultKind,
    TEMPLATE_PAGES, TEMPLATE_PLATFORMS,
};
pub use target::{ExtractionTarget, MAX_SEARCH_DEPTH};

/// A validated extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionRequest {
    /// Where to extract from.
    pub target: ExtractionTarget,
    /// What to extract.
    pub info_request: InfoRequestSpec,
}

impl ExtractionRequest {
    /// Creates a request from already-typed parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is invalid or the info request is
    /// empty.
    pub fn new(
        url: impl Into<String>,
        depth: u8,
        info_request: InfoRequestSpec,
    ) -> Result<Self, RequestValidationError> {
        let mut errors = RequestValidationError::new();
        let target = ExtractionTarget::new(url, depth).map_err(|e| errors.merge(e)).ok();
        if info_request.is_empty() {
            errors.push(missing("info_request"));
        }

        match target {
            Some(target) if errors.is_empty() => Ok(Self {
                target,
                info_request,
            }),
            _ => Err(errors),
        }
    }

    /// Validates a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns every problem found in `web_url`, `max_search_depth` and
    /// `info_request`.
    pub fn from_value(body: &Value) -> Result<Self, RequestValidationError> {
        let Some(object) = body.as_object() else {
            return Err(RequestValidationError::single(ValidationIssue::new(
                "body",
                codes::NOT_OBJECT,
                "The request body must be a JSON object",
            )));
        };

        let mut errors = RequestValidationError::new();

        let url = match object.get("web_url") {
            Some(Value::String(url)) if !url.trim().is_empty() => Some(url.clone()),
            Some(Value::String(_) | Value::Null) | None => {
                errors.push(missing("web_url"));
                None
            }
            Some(other) => {
                errors.push(
                    ValidationIssue::new(
                        "web_url",
                        codes::INVALID_URL,
                        "`web_url` must be a string",
                    )
                    .with_context_entry("type", schema::json_type(other)),
                );
                None
            }
        };
        if let Some(url) = url.as_deref() {
            if let Err(issue) = target::check_url(url) {
                errors.push(issue);
            }
        }

        let depth = match object.get("max_search_depth") {
            None | Some(Value::Null) => Some(0),
            Some(value) => {
                let depth = value
                    .as_u64()
                    .and_then(|d| u8::try_from(d).ok())
                    .filter(|d| *d <= MAX_SEARCH_DEPTH);
                if depth.is_none() {
                    errors.push(target::depth_issue(&value.to_string()));
                }
                depth
            }
        };

        let info_request = match object.get("info_request") {
            None | Some(Value::Null) => {
                errors.push(missing("info_request"));
                None
            }
            Some(value) => match InfoRequestSpec::from_value(value, "info_request") {
                Ok(spec) if spec.is_empty() => {
                    errors.push(missing("info_request"));
                    None
                }
                Ok(spec) => Some(spec),
                Err(e) => {
                    errors.merge(e);
                    None
                }
            },
        };

        match (url, depth, info_request) {
            (Some(url), Some(depth), Some(info_request)) if errors.is_empty() => {
                Self::new(url, depth, info_request)
            }
            _ => Err(errors),
        }
    }
}

fn missing(field: &str) -> ValidationIssue {
    ValidationIssue::new(
        field,
        codes::MISSING_FIELD,
        format!("`{field}` is required and must not be empty"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_valid_body_with_default_depth() {
        let request = ExtractionRequest::from_value(&json!({
            "web_url": "https://acme.com",
            "info_request": {"name": true}
        }))
        .unwrap();

        assert_eq!(request.target.url(), "https://acme.com");
        assert_eq!(request.target.depth(), 0);
        assert!(request.info_request.contains(FieldKey::Name));
    }

    #[test]
    fn test_every_body_problem_reported() {
        let err = ExtractionRequest::from_value(&json!({
            "web_url": "not a url",
            "max_search_depth": 5,
            "info_request": {"foo": true}
        }))
        .unwrap_err();

        assert_eq!(
            err.fields(),
            vec!["web_url", "max_search_depth", "info_request.foo"]
        );
    }

    #[test]
    fn test_missing_fields() {
        let err = ExtractionRequest::from_value(&json!({"info_request": {}})).unwrap_err();
        assert_eq!(err.fields(), vec!["web_url", "info_request"]);
        assert!(err.issues.iter().all(|i| i.code == codes::MISSING_FIELD));
    }

    #[test]
    fn test_depth_must_be_a_small_integer() {
        for depth in [json!(-1), json!(1.5), json!("1"), json!(3)] {
            let err = ExtractionRequest::from_value(&json!({
                "web_url": "https://acme.com",
                "max_search_depth": depth,
                "info_request": {"name": true}
            }))
            .unwrap_err();
            assert!(err.has_field("max_search_depth"));
        }
    }

    #[test]
    fn test_body_must_be_object() {
        let err = ExtractionRequest::from_value(&json!("https://acme.com")).unwrap_err();
        assert_eq!(err.issues[0].code, codes::NOT_OBJECT);
    }

    #[test]
    fn test_new_rejects_empty_info_request() {
        let err =
            ExtractionRequest::new("https://acme.com", 0, InfoRequestSpec::new()).unwrap_err();
        assert!(err.has_field("info_request"));
    }
}
