//! Testing utilities for extractions without a network.
//!
//! This module provides:
//! - `StaticFetcher`, an in-memory page fetcher
//! - `HtmlPage`, a builder for fixture documents
//! - fixtures that wire both into contexts and extractors
//! - assertions over structured responses

mod assertions;
mod fetchers;
pub mod fixtures;

pub use assertions::{
    assert_complete, assert_field_empty, assert_field_failed, assert_list_contains,
};
pub use fetchers::StaticFetcher;
pub use fixtures::HtmlPage;
