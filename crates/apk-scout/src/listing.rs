//! Search listing pages: validation and row parsing.

use scraper::{ElementRef, Html, Selector};

use crate::normalize::Normalizer;
use crate::types::ListingEntry;

const ITEM: &str = ".column-games-item";
const ITEM_NAME: &str = ".column-games-item-info-name";
const ITEM_ICON: &str = ".column-games-item-icon";
const ITEM_VERSION: &str = ".column-games-item-info-version";
const RESULTS_TITLE: &str = ".column-title";

/// Phrases the site shows when a query matches nothing.
const NO_RESULT_PHRASES: [&str; 2] = ["no results", "nothing found"];

/// Size reported when a row carries no metadata element.
pub const UNKNOWN_SIZE: &str = "Unknown";

/// Path of listing page `page` (1-based) for `query`.
pub fn search_path(query: &str, page: u32) -> String {
    let query = urlencoding::encode(query.trim());
    if page <= 1 {
        format!("/search/{query}")
    } else {
        format!("/search/{query}/page/{page}")
    }
}

/// Accepts real search pages: with items, with a no-results notice, or the results shell.
pub fn is_search_page(doc: &Html) -> bool {
    if has_any(doc, ITEM) || has_any(doc, RESULTS_TITLE) {
        return true;
    }
    let text = doc.root_element().text().collect::<String>().to_lowercase();
    NO_RESULT_PHRASES.iter().any(|p| text.contains(p))
}

/// Number of listing rows on the page, including rows that will be skipped.
pub fn item_count(doc: &Html) -> usize {
    match Selector::parse(ITEM) {
        Ok(sel) => doc.select(&sel).count(),
        Err(_) => 0,
    }
}

/// Parse listing rows into entries, at most `max` of them.
pub fn parse_entries(doc: &Html, normalizer: &Normalizer, max: usize) -> Vec<ListingEntry> {
    let Ok(sel) = Selector::parse(ITEM) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|item| parse_entry(item, normalizer))
        .take(max)
        .collect()
}

fn parse_entry(item: ElementRef<'_>, normalizer: &Normalizer) -> Option<ListingEntry> {
    let name = stripped_text(first(item, ITEM_NAME)?);

    let detail_url = normalizer.normalize(item.value().attr("href").unwrap_or_default());

    let image_url = first(item, ITEM_ICON)
        .and_then(|img| {
            let attrs = img.value();
            attrs
                .attr("src")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| attrs.attr("data-src"))
        })
        .map(|src| normalizer.normalize(src))
        .unwrap_or_default();

    let size_text = first(item, ITEM_VERSION)
        .map(|meta| size_from_meta(&stripped_text(meta)))
        .unwrap_or_else(|| UNKNOWN_SIZE.to_string());

    Some(ListingEntry {
        name,
        detail_url,
        image_url,
        size_text,
    })
}

/// Size part of a "version + size" metadata line.
pub fn size_from_meta(meta: &str) -> String {
    match meta.rsplit_once('+') {
        Some((_, size)) => size.trim().to_string(),
        None => meta.to_string(),
    }
}

fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    scope.select(&sel).next()
}

fn has_any(doc: &Html, css: &str) -> bool {
    Selector::parse(css)
        .map(|sel| doc.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// Concatenation of the element's text nodes, each trimmed.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}
