//! HTML parsing helpers built on `scraper`.
//!
//! Every function parses the document it is given and returns owned data;
//! parsed documents never outlive the call.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use super::{Tag, TagQuery};

#[allow(clippy::expect_used)]
static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}\b")
        .expect("static regex")
});

#[allow(clippy::expect_used)]
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{5,}\d").expect("static regex"));

const SKIPPED_TEXT_PARENTS: [&str; 3] = ["script", "style", "noscript"];
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Fixes the `scheme:///host` typo some sites ship in their links.
#[must_use]
pub fn repair_href(href: &str) -> String {
    href.trim().replace(":///", "://")
}

/// Returns the absolute http(s) links of a page, deduplicated in page order.
///
/// `javascript:` and fragment-only links are dropped, as are links with
/// other schemes such as `mailto:`.
#[must_use]
pub fn links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&ANCHORS)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

fn resolve_link(href: &str, page_url: &Url) -> Option<String> {
    let href = repair_href(href);
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:")
    {
        return None;
    }

    let mut resolved = page_url.join(&href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.into())
}

/// Returns the elements matching `query`.
#[must_use]
pub fn tags(html: &str, page_url: &str, query: &TagQuery) -> Vec<Tag> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(&query.name) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|el| query.matches(el.value().name(), |attr| el.value().attr(attr)))
        .map(|el| Tag {
            name: el.value().name().to_ascii_lowercase(),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
            text: collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")),
            page_url: page_url.to_string(),
        })
        .collect()
}

/// Returns the visible text of a page, one text node per line.
///
/// Text inside `script`, `style` and `noscript` is skipped.
#[must_use]
pub fn visible_text(html: &str) -> String {
    text_nodes(html).join("\n")
}

/// The trimmed, non-empty visible text nodes of a page, in document order.
fn text_nodes(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut nodes = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| SKIPPED_TEXT_PARENTS.contains(&el.value().name()));
        let trimmed = text.trim();
        if !hidden && !trimmed.is_empty() {
            nodes.push(trimmed.to_string());
        }
    }

    nodes
}

/// Returns every match of `pattern` in the visible text of a page.
#[must_use]
pub fn text_matches(html: &str, pattern: &Regex) -> Vec<String> {
    let text = visible_text(html);
    pattern
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Returns email addresses from page text and `mailto:` links, lowercased.
#[must_use]
pub fn emails(html: &str) -> Vec<String> {
    let mut found: Vec<String> = EMAIL
        .find_iter(&visible_text(html))
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect();

    found.extend(scheme_targets(html, "mailto:").into_iter().filter_map(|target| {
        let address = target.split('?').next().unwrap_or_default();
        let decoded = urlencoding::decode(address).map_or_else(|_| address.to_string(), |d| d.into_owned());
        EMAIL
            .find(&decoded)
            .filter(|m| m.as_str().len() == decoded.trim().len())
            .map(|m| m.as_str().to_ascii_lowercase())
    }));

    found
}

/// Returns phone numbers from page text and `tel:` links.
///
/// Text matches are kept only when they carry between 7 and 15 digits.
#[must_use]
pub fn phone_numbers(html: &str) -> Vec<String> {
    let mut found: Vec<String> = text_nodes(html)
        .iter()
        .map(|node| collapse_whitespace(node))
        .flat_map(|node| {
            PHONE
                .find_iter(&node)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|candidate| plausible_phone(candidate))
        .collect();

    found.extend(
        scheme_targets(html, "tel:")
            .into_iter()
            .map(|target| {
                urlencoding::decode(&target).map_or(target.clone(), |d| d.into_owned())
            })
            .map(|number| collapse_whitespace(&number))
            .filter(|number| plausible_phone(number)),
    );

    found
}

fn plausible_phone(candidate: &str) -> bool {
    let digits = candidate.chars().filter(char::is_ascii_digit).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

fn scheme_targets(html: &str, scheme: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHORS)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| {
            href.get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        })
        .map(|href| href[scheme.len()..].trim().to_string())
        .filter(|target| !target.is_empty())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r##"
        <html>
          <head>
            <title> Acme   Corp </title>
            <link rel="Shortcut Icon" href="/favicon.ico">
            <style>.a { color: red }</style>
          </head>
          <body>
            <script>var hidden = "x@script.com";</script>
            <a href="/about">About us</a>
            <a href="https:///acme.com/contact#form">Contact</a>
            <a href="javascript:void(0)">Menu</a>
            <a href="#top">Top</a>
            <a href="https://www.facebook.com/acme">Facebook</a>
            <a href="/about">About again</a>
            <a href="mailto:Sales@Acme.com?subject=hi">Email</a>
            <a href="tel:+1-555-010-9999">Call</a>
            <p>Write to info@acme.com or call (555) 010-1234.</p>
            <p>Founded 1999.</p>
          </body>
        </html>"##;

    fn page_url() -> Url {
        Url::parse("https://acme.com/").unwrap()
    }

    #[test]
    fn test_links_resolved_filtered_and_deduplicated() {
        assert_eq!(
            links(PAGE, &page_url()),
            vec![
                "https://acme.com/about".to_string(),
                "https://acme.com/contact".to_string(),
                "https://www.facebook.com/acme".to_string(),
            ]
        );
    }

    #[test]
    fn test_tags_match_rel_tokens() {
        let query = TagQuery::new("link").with_attr("rel", ["icon"]);
        let found = tags(PAGE, "https://acme.com/", &query);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("rel"), Some("Shortcut Icon"));
        assert_eq!(
            found[0].resource_url().as_deref(),
            Some("https://acme.com/favicon.ico")
        );
    }

    #[test]
    fn test_tags_collect_text() {
        let found = tags(PAGE, "https://acme.com/", &TagQuery::new("title"));
        assert_eq!(found[0].text(), "Acme Corp");
    }

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let text = visible_text(PAGE);
        assert!(text.contains("Founded 1999."));
        assert!(!text.contains("script.com"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_emails_from_text_and_mailto() {
        let found = emails(PAGE);
        assert!(found.contains(&"info@acme.com".to_string()));
        assert!(found.contains(&"sales@acme.com".to_string()));
        assert!(!found.iter().any(|e| e.contains("script.com")));
    }

    #[test]
    fn test_phone_numbers_from_text_and_tel() {
        let found = phone_numbers(PAGE);
        assert!(found.contains(&"(555) 010-1234".to_string()));
        assert!(found.contains(&"+1-555-010-9999".to_string()));
        assert!(!found.iter().any(|p| p.contains("1999")));
    }

    #[test]
    fn test_phone_numbers_stay_within_one_text_node() {
        let page = "<p>Call +1 (555) 010-9999</p>\n<p>123 Main Street</p><p>Since\n   2001 and 2002</p>";
        assert_eq!(phone_numbers(page), vec!["+1 (555) 010-9999".to_string()]);
    }

    #[test]
    fn test_text_matches() {
        let pattern = Regex::new(r"Founded \d{4}").unwrap();
        assert_eq!(text_matches(PAGE, &pattern), vec!["Founded 1999".to_string()]);
    }

    #[test]
    fn test_repair_href() {
        assert_eq!(repair_href(" https:///acme.com/x "), "https://acme.com/x");
    }
}
