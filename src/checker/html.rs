// src/checker/html.rs
// =============================================================================
// This module extracts links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to:
// - Parse and validate URLs
// - Resolve relative URLs to absolute URLs
//
// Output rules:
// - mailto:, tel:, javascript: and in-page #fragment links are skipped
// - only http/https targets survive (nothing else can be fetched)
// - each absolute URL appears once; the first anchor's text wins
// - results keep document order, so "first 20 links" means the first 20 on the page
// =============================================================================

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use url::Url;

/// Longest anchor text kept per link
pub const ANCHOR_TEXT_LIMIT: usize = 50;

// Prefixes of href values that never point at a fetchable page
const SKIPPED_PREFIXES: [&str; 4] = ["mailto:", "tel:", "javascript:", "#"];

// A link found on a page, ready to be checked
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCandidate {
    pub absolute_url: String,
    /// Trimmed inner text of the anchor, at most 50 characters
    pub anchor_text: String,
}

// Extracts all checkable links from HTML content
//
// Parameters:
//   base_url: the URL of the page (for resolving relative links)
//   html: the HTML content to parse
//
// Returns: distinct links in document order
//
// Example:
//   html = "<a href='/docs'>Docs</a>"
//   base_url = "https://example.com"
//   result = [LinkCandidate { absolute_url: "https://example.com/docs", anchor_text: "Docs" }]
pub fn extract_links(base_url: &str, html: &str) -> Vec<LinkCandidate> {
    let mut links = Vec::new();

    // Parse the base URL once; without it relative links cannot be resolved
    let base = match Url::parse(base_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Invalid base URL {}: {}", base_url, e);
            return links;
        }
    };

    let document = Html::parse_document(html);

    // The selector is a constant, so failing to parse it is a programmer error
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    let mut seen = HashSet::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(absolute_url) = resolve_url(&base, href) else {
            continue;
        };

        // Set semantics: later duplicates are dropped silently
        if !seen.insert(absolute_url.clone()) {
            continue;
        }

        let text: String = element.text().collect();
        links.push(LinkCandidate {
            absolute_url,
            anchor_text: truncate_text(text.trim(), ANCHOR_TEXT_LIMIT),
        });
    }

    links
}

// Resolves a possibly-relative href to an absolute http(s) URL
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs"                -> Some("https://example.com/docs")
//   href = "../other"             -> Some("https://example.com/other")
//   href = "https://other.com"    -> Some("https://other.com/")
//   href = "javascript:void(0)"   -> None
//   href = "http://[broken"       -> None (unparseable, dropped silently)
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if is_skipped_href(href) {
        return None;
    }

    // join() handles both absolute and relative hrefs
    let url = base.join(href).ok()?;
    if is_checkable_link(&url) {
        Some(url.to_string())
    } else {
        None
    }
}

fn is_skipped_href(href: &str) -> bool {
    let lowered = href.to_ascii_lowercase();
    SKIPPED_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

// Only HTTP/HTTPS can be probed; data:, ftp:, file: and friends are skipped
fn is_checkable_link(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

// Cuts text to `limit` characters (not bytes, so multi-byte text never splits)
fn truncate_text(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
