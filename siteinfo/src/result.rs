//! Extraction results and their shape rules.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::ResultShapeError;
use crate::request::{FieldKey, ResultKind};

/// A leaf of a mapping value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    /// Nothing found.
    Empty,
    /// A single string.
    Text(String),
    /// A list of strings.
    List(Vec<String>),
}

impl Leaf {
    /// `Empty` for `None`, `Text` otherwise.
    #[must_use]
    pub fn from_option(value: Option<String>) -> Self {
        value.map_or(Self::Empty, Self::Text)
    }

    /// `Empty` for an empty list, `List` otherwise.
    #[must_use]
    pub fn from_list(items: Vec<String>) -> Self {
        if items.is_empty() {
            Self::Empty
        } else {
            Self::List(items)
        }
    }

    /// Whether this leaf carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(_) => false,
            Self::List(items) => items.is_empty(),
        }
    }
}

/// The value extracted for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Nothing found; serializes as `null`.
    Empty,
    /// A single string.
    Text(String),
    /// A list of strings.
    List(Vec<String>),
    /// A one-level mapping.
    Map(BTreeMap<String, Leaf>),
}

impl FieldValue {
    /// The value a field degrades to when its extraction fails.
    #[must_use]
    pub fn empty_for(key: FieldKey) -> Self {
        match key.result_kind() {
            ResultKind::Single => Self::Empty,
            ResultKind::List => Self::List(Vec::new()),
            ResultKind::Map => Self::Map(BTreeMap::new()),
        }
    }

    /// `Empty` for `None`, `Text` otherwise.
    #[must_use]
    pub fn from_option(value: Option<String>) -> Self {
        value.map_or(Self::Empty, Self::Text)
    }

    /// Gets the text, if this is a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Gets the items, if this is a `List` value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Gets the entries, if this is a `Map` value.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Leaf>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Converts to JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Leaf {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::List(items) => items.serialize(serializer),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::List(items) => items.serialize(serializer),
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, leaf) in entries {
                    map.serialize_entry(key, leaf)?;
                }
                map.end()
            }
        }
    }
}

/// Mapping from requested field to extracted value.
pub type RawResult = BTreeMap<FieldKey, FieldValue>;

/// A field whose extraction failed and degraded to its empty value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldFailure {
    /// The field, or `field.item` for one item of a batch.
    pub field: String,
    /// What went wrong.
    pub message: String,
}

impl FieldFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A field value plus the failures of any sub-lookups behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    /// The value.
    pub value: FieldValue,
    /// Sub-lookups that failed.
    pub failures: Vec<FieldFailure>,
}

impl FieldOutcome {
    /// Attaches failures to the outcome.
    #[must_use]
    pub fn with_failures(mut self, failures: Vec<FieldFailure>) -> Self {
        self.failures.extend(failures);
        self
    }
}

impl From<FieldValue> for FieldOutcome {
    fn from(value: FieldValue) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }
}

/// Checks that a result fits the response schema.
///
/// Every key must have been requested, every value must have its key's
/// shape, list items must be non-empty strings and emails must contain
/// exactly one `@`.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_shape(
    result: &RawResult,
    requested: &BTreeSet<FieldKey>,
) -> Result<(), ResultShapeError> {
    for (key, value) in result {
        if !requested.contains(key) {
            return Err(ResultShapeError::new(key.as_str(), "key was not requested"));
        }
        validate_value(*key, value)?;
    }
    Ok(())
}

fn validate_value(key: FieldKey, value: &FieldValue) -> Result<(), ResultShapeError> {
    let field = key.as_str();
    match (key.result_kind(), value) {
        (_, FieldValue::Empty) => Ok(()),
        (ResultKind::Single, FieldValue::Text(text)) => non_empty(field, text),
        (ResultKind::List, FieldValue::List(items)) => {
            for item in items {
                non_empty(field, item)?;
                if key == FieldKey::AllEmails && item.matches('@').count() != 1 {
                    return Err(ResultShapeError::new(
                        field,
                        format!("`{item}` is not a single email address"),
                    ));
                }
            }
            Ok(())
        }
        (ResultKind::Map, FieldValue::Map(entries)) => entries
            .iter()
            .try_for_each(|(sub, leaf)| validate_leaf(key, sub, leaf)),
        (kind, _) => Err(ResultShapeError::new(
            field,
            format!("expected {kind:?} value"),
        )),
    }
}

fn validate_leaf(key: FieldKey, sub: &str, leaf: &Leaf) -> Result<(), ResultShapeError> {
    let field = format!("{}.{sub}", key.as_str());
    let allowed = match (key, leaf) {
        (FieldKey::SiteSocials, Leaf::Text(_))
        | (FieldKey::SocialMediaLinks, Leaf::List(_) | Leaf::Empty)
        | (FieldKey::PagesUrl, Leaf::Text(_) | Leaf::Empty) => true,
        _ => false,
    };
    if !allowed {
        return Err(ResultShapeError::new(field, format!("unexpected value {leaf:?}")));
    }

    match leaf {
        Leaf::Empty => Ok(()),
        Leaf::Text(text) => non_empty(&field, text),
        Leaf::List(items) => items.iter().try_for_each(|item| non_empty(&field, item)),
    }
}

fn non_empty(field: &str, item: &str) -> Result<(), ResultShapeError> {
    if item.trim().is_empty() {
        Err(ResultShapeError::new(field, "empty string item"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn all_keys() -> BTreeSet<FieldKey> {
        FieldKey::ALL.into_iter().collect()
    }

    #[test]
    fn test_serialization_shapes() {
        let mut result = RawResult::new();
        result.insert(FieldKey::Name, FieldValue::Empty);
        result.insert(FieldKey::AllEmails, FieldValue::List(vec!["a@x.com".into()]));
        result.insert(
            FieldKey::SocialMediaLinks,
            FieldValue::Map(BTreeMap::from([
                ("facebook".to_string(), Leaf::List(vec!["https://facebook.com/a".into()])),
                ("twitter".to_string(), Leaf::Empty),
            ])),
        );

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "name": null,
                "all_emails": ["a@x.com"],
                "social_media_links": {
                    "facebook": ["https://facebook.com/a"],
                    "twitter": null
                }
            })
        );
    }

    #[test]
    fn test_empty_values_per_kind() {
        assert_eq!(FieldValue::empty_for(FieldKey::Name), FieldValue::Empty);
        assert_eq!(FieldValue::empty_for(FieldKey::AllLinks), FieldValue::List(vec![]));
        assert_eq!(
            FieldValue::empty_for(FieldKey::PagesUrl),
            FieldValue::Map(BTreeMap::new())
        );
        for key in FieldKey::ALL {
            let result = RawResult::from([(key, FieldValue::empty_for(key))]);
            assert!(validate_shape(&result, &all_keys()).is_ok());
        }
    }

    #[test]
    fn test_unrequested_key_rejected() {
        let result = RawResult::from([(FieldKey::Name, FieldValue::Text("Acme".into()))]);
        let requested = BTreeSet::from([FieldKey::Logos]);
        assert!(validate_shape(&result, &requested).is_err());
    }

    #[test]
    fn test_email_items_need_one_at_sign() {
        let result = RawResult::from([(
            FieldKey::AllEmails,
            FieldValue::List(vec!["a@b@c.com".into()]),
        )]);
        let err = validate_shape(&result, &all_keys()).unwrap_err();
        assert_eq!(err.field, "all_emails");
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let result = RawResult::from([(FieldKey::Logos, FieldValue::Text("x".into()))]);
        assert!(validate_shape(&result, &all_keys()).is_err());

        let result = RawResult::from([(
            FieldKey::SiteSocials,
            FieldValue::Map(BTreeMap::from([("facebook".to_string(), Leaf::Empty)])),
        )]);
        assert!(validate_shape(&result, &all_keys()).is_err());
    }

    #[test]
    fn test_blank_items_rejected() {
        let result = RawResult::from([(FieldKey::AllLinks, FieldValue::List(vec![" ".into()]))]);
        assert!(validate_shape(&result, &all_keys()).is_err());
    }

    #[test]
    fn test_leaf_helpers() {
        assert_eq!(Leaf::from_option(None), Leaf::Empty);
        assert_eq!(Leaf::from_list(vec![]), Leaf::Empty);
        assert!(!Leaf::Text("x".into()).is_empty());
    }
}
