//! Download link extraction from the embedded hydration payload.
//!
//! The download-intermediate page ships its state as one flat JSON array
//! inside `<script id="__NUXT_DATA__">`: primitives and back-references
//! mixed together, with every string stored once. File links sit among
//! those strings next to same-host advertising and video links; only
//! entries on an allow-listed host that carry a `/download/` path segment
//! are kept.

use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;
use url::Url;

/// Selector of the script element carrying the payload.
pub const PAYLOAD_SCRIPT: &str = "script#__NUXT_DATA__";

/// Path segment present in real file links.
const DOWNLOAD_SEGMENT: &str = "/download/";

/// Whether the document carries the hydration payload script.
pub fn has_payload(doc: &Html) -> bool {
    Selector::parse(PAYLOAD_SCRIPT)
        .map(|sel| doc.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// Extract file download links from the page's hydration payload.
///
/// A missing script or unparsable payload yields an empty set.
pub fn extract_download_links(doc: &Html, allowed_hosts: &[String]) -> BTreeSet<String> {
    let Ok(sel) = Selector::parse(PAYLOAD_SCRIPT) else {
        return BTreeSet::new();
    };
    let Some(script) = doc.select(&sel).next() else {
        return BTreeSet::new();
    };

    let text: String = script.text().collect();
    let payload = match parse_payload(&text) {
        Ok(items) => items,
        Err(e) => {
            debug!(error = %e, "malformed hydration payload, treating as empty");
            return BTreeSet::new();
        }
    };

    payload
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| is_download_link(s, allowed_hosts))
        .map(str::to_string)
        .collect()
}

/// Why a payload could not be used.
#[derive(thiserror::Error, Debug)]
enum MalformedPayload {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a flat array, got {0}")]
    NotAnArray(&'static str),
}

fn parse_payload(text: &str) -> Result<Vec<Value>, MalformedPayload> {
    match serde_json::from_str::<Value>(text.trim())? {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Err(MalformedPayload::NotAnArray("object")),
        Value::String(_) => Err(MalformedPayload::NotAnArray("string")),
        Value::Number(_) => Err(MalformedPayload::NotAnArray("number")),
        Value::Bool(_) => Err(MalformedPayload::NotAnArray("bool")),
        Value::Null => Err(MalformedPayload::NotAnArray("null")),
    }
}

/// HTTP(S) link on an allow-listed host (or subdomain) with a `/download/` segment.
fn is_download_link(candidate: &str, allowed_hosts: &[String]) -> bool {
    if !(candidate.contains("http://") || candidate.contains("https://")) {
        return false;
    }
    if !candidate.contains(DOWNLOAD_SEGMENT) {
        return false;
    }
    let Ok(parsed) = Url::parse(candidate) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    })
}
