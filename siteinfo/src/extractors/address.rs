//! Postal address extraction. Best effort: results are plausible, not
//! verified.

use regex::Regex;
use std::sync::LazyLock;

use super::ExtractionContext;
use crate::errors::ExtractionError;

/// A number, one to three word groups, then an optional short token and an
/// optional postal-code-shaped token.
#[allow(clippy::expect_used)]
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2,5}[-;.|:]*)+(\s*[\w.\s,]+){1,3}[.|\s]*(\w{2,3})?[.|\s]*(\d{5}|\w{2,3})?")
        .expect("address pattern is valid")
});

#[allow(clippy::expect_used)]
static NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("newline pattern is valid"));

/// Words that mark a span as an address.
const ADDRESS_WORDS: &[&str] = &[
    // street types
    "street", "st", "avenue", "ave", "road", "rd", "boulevard", "blvd", "lane", "ln",
    "drive", "dr", "court", "ct", "place", "pl", "square", "sq", "highway", "hwy",
    "parkway", "pkwy", "terrace", "crescent", "alley", "circle", "expressway", "freeway",
    "plaza", "route", "strasse", "straße", "rue", "calle", "via",
    // unit, room and building designators
    "suite", "ste", "unit", "apt", "apartment", "floor", "fl", "room", "rm", "building",
    "bldg", "block", "tower", "office", "po", "box", "house",
    // administrative divisions
    "city", "state", "county", "province", "district", "region", "zip", "postcode",
    "p.o",
];

/// Whether a span mentions at least one address word.
#[must_use]
pub fn mentions_address_word(span: &str) -> bool {
    span.split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|token| token.trim_end_matches('.').to_lowercase())
        .any(|token| !token.is_empty() && ADDRESS_WORDS.contains(&token.as_str()))
}

/// Finds address-shaped spans in a text, in order.
#[must_use]
pub fn addresses_in(matches: impl IntoIterator<Item = String>) -> Vec<String> {
    matches
        .into_iter()
        .filter(|span| mentions_address_word(span))
        .map(|span| NEWLINES.replace_all(&span, " ").trim().to_string())
        .filter(|span| !span.is_empty())
        .collect()
}

/// Returns the address-like spans of the target page.
///
/// # Errors
///
/// Returns an error if the target page cannot be read.
pub async fn resolve_addresses(ctx: &ExtractionContext) -> Result<Vec<String>, ExtractionError> {
    ctx.ensure_active()?;
    let spans = ctx.provider().find_text_matches(ctx.url(), &ADDRESS).await?;
    Ok(addresses_in(spans))
}
