//! Field extractors.
//!
//! Each extractor reads pages through the [`ExtractionContext`]'s provider
//! and returns plain data. Batch extractors fan out through the context's
//! resolver and report per-item failures instead of failing as a whole.

mod address;
mod contacts;
mod context;
mod logos;
mod name;
mod pages;
mod socials;

use std::collections::{BTreeMap, HashMap};
use tracing::warn;

pub use address::{addresses_in, mentions_address_word, resolve_addresses};
pub use contacts::{resolve_emails, resolve_links, resolve_phone_numbers};
pub use context::ExtractionContext;
pub use logos::resolve_logos;
pub use name::resolve_name;
pub use pages::{guess_page_url, guess_pages, trim_path};
pub use socials::{find_social_handle, links_related_to, resolve_social_handles, resolve_social_links};

use crate::errors::ExtractionError;
use crate::request::FieldKey;
use crate::result::{FieldFailure, Leaf};

/// Folds the results of a batch into map entries and failures.
///
/// `to_leaf` gets `None` for a failed lookup; returning `None` drops the
/// entry. Failures are recorded as `field.item`.
pub(crate) fn batch_outcome<V>(
    key: FieldKey,
    results: HashMap<String, Result<V, ExtractionError>>,
    to_leaf: impl Fn(Option<V>) -> Option<Leaf>,
) -> (BTreeMap<String, Leaf>, Vec<FieldFailure>) {
    let sorted: BTreeMap<String, Result<V, ExtractionError>> = results.into_iter().collect();
    let mut entries = BTreeMap::new();
    let mut failures = Vec::new();

    for (item, result) in sorted {
        let value = match result {
            Ok(value) => Some(value),
            Err(err) => {
                let field = format!("{key}.{item}");
                warn!(field = %field, error = %err, "Sub-lookup failed");
                failures.push(FieldFailure::new(field, err.to_string()));
                None
            }
        };
        if let Some(leaf) = to_leaf(value) {
            entries.insert(item, leaf);
        }
    }
    (entries, failures)
}
