//! Test assertions for structured responses.

use crate::request::FieldKey;
use crate::response::StructuredResponse;
use crate::result::FieldValue;

/// Asserts that every requested field resolved cleanly.
pub fn assert_complete(response: &StructuredResponse) {
    assert!(
        response.is_complete(),
        "Expected no partial failures, got: {:?}",
        response.partial_failures
    );
}

/// Asserts that a field, or a `field.item`, was reported as failed.
pub fn assert_field_failed(response: &StructuredResponse, field: &str) {
    assert!(
        response.partial_failures.iter().any(|f| f.field == field),
        "Expected a failure for '{}', got: {:?}",
        field,
        response.partial_failures
    );
}

/// Asserts that a field was resolved to an empty value.
pub fn assert_field_empty(response: &StructuredResponse, key: FieldKey) {
    let value = response.meta_data.get(&key);
    let empty = match value {
        Some(FieldValue::Empty) => true,
        Some(FieldValue::List(items)) => items.is_empty(),
        Some(FieldValue::Map(entries)) => entries.values().all(crate::result::Leaf::is_empty),
        Some(FieldValue::Text(_)) | None => false,
    };
    assert!(empty, "Expected '{key}' to be empty, got {value:?}");
}

/// Asserts that a list field contains an item.
pub fn assert_list_contains(response: &StructuredResponse, key: FieldKey, item: &str) {
    let items = response
        .meta_data
        .get(&key)
        .and_then(FieldValue::as_list)
        .unwrap_or_default();
    assert!(
        items.iter().any(|i| i == item),
        "Expected '{key}' to contain '{item}', got {items:?}"
    );
}
