//! Detail and download resolution for a single listing entry.
//!
//! entry → proxied detail page → first download anchor → proxied
//! download-intermediate page → hydration payload links.
//!
//! Every failure is returned as an [`ItemFailure`] naming the entry and the
//! stage it failed in; nothing is dropped.

use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::extract::{self, extract_download_links};
use crate::fetcher::{Fetcher, Page};
use crate::normalize::Normalizer;
use crate::types::{FetchTarget, ItemFailure, ListingEntry, ResolutionStage, ResultRecord, NOT_FOUND};

/// Anchor on the detail page leading to the download-intermediate page.
const DOWNLOAD_ANCHOR: &str = "a.apk-download-btn";

/// Marker of the manual download box on the intermediate page.
const DOWNLOAD_BOX: &str = ".download-btn-box";

/// Resolves listing entries into result records.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Fetcher,
    normalizer: Arc<Normalizer>,
}

impl Resolver {
    pub fn new(fetcher: Fetcher, normalizer: Arc<Normalizer>) -> Self {
        Self { fetcher, normalizer }
    }

    /// Resolve one entry into a record, or a failure attributed to it.
    pub async fn resolve(&self, entry: &ListingEntry) -> Result<ResultRecord, ItemFailure> {
        let link = self.normalizer.normalize(&entry.detail_url);
        let fail = |stage: ResolutionStage, reason: String| {
            let failure = ItemFailure {
                name: entry.name.clone(),
                link: link.clone(),
                stage,
                reason,
            };
            warn!(name = %failure.name, stage = %stage, reason = %failure.reason, "item resolution failed");
            failure
        };

        if entry.detail_url.is_empty() {
            return Err(fail(ResolutionStage::Detail, "listing row has no link".to_string()));
        }

        let detail_target = FetchTarget::proxied(self.normalizer.proxied(&entry.detail_url));
        let detail = self
            .fetcher
            .fetch_until_valid(detail_target, has_download_anchor)
            .await
            .map_err(|e| fail(ResolutionStage::Detail, e.to_string()))?;

        let href = download_anchor_href(&detail)
            .ok_or_else(|| fail(ResolutionStage::Detail, "missing download anchor".to_string()))?;
        let intermediate = self.normalizer.normalize(&href);
        if intermediate.is_empty() {
            return Err(fail(
                ResolutionStage::Detail,
                format!("download anchor has no usable target: {href:?}"),
            ));
        }
        debug!(name = %entry.name, %intermediate, "resolved download page");

        let download_target = FetchTarget::proxied(self.normalizer.proxied(&intermediate));
        let download = self
            .fetcher
            .fetch_until_valid(download_target, is_download_page)
            .await
            .map_err(|e| fail(ResolutionStage::Download, e.to_string()))?;

        let links = {
            let doc = download.document();
            extract_download_links(&doc, &self.normalizer.site().download_hosts)
        };
        debug!(name = %entry.name, links = links.len(), "extracted download links");

        let download = if links.is_empty() {
            NOT_FOUND.to_string()
        } else {
            links.into_iter().collect::<Vec<_>>().join(", ")
        };

        Ok(ResultRecord {
            name: entry.name.clone(),
            link,
            image: entry.image_url.clone(),
            download,
            size: entry.size_text.clone(),
        })
    }
}

/// Detail page validator.
pub fn has_download_anchor(doc: &Html) -> bool {
    matches_any(doc, DOWNLOAD_ANCHOR)
}

/// Download-intermediate page validator.
pub fn is_download_page(doc: &Html) -> bool {
    extract::has_payload(doc) || matches_any(doc, DOWNLOAD_BOX)
}

fn download_anchor_href(page: &Page) -> Option<String> {
    let doc = page.document();
    first_href(&doc)
}

fn first_href(doc: &Html) -> Option<String> {
    let sel = Selector::parse(DOWNLOAD_ANCHOR).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

fn matches_any(doc: &Html, css: &str) -> bool {
    Selector::parse(css)
        .map(|sel| doc.select(&sel).next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_validator() {
        let ok = Html::parse_document(
            r#"<a class="apk-download-btn" href="/minecraft/download">Download</a>"#,
        );
        let no_href = Html::parse_document(r#"<a class="apk-download-btn">Download</a>"#);
        let missing = Html::parse_document(r#"<a class="btn" href="/x">Download</a>"#);
        assert!(has_download_anchor(&ok));
        assert!(has_download_anchor(&no_href));
        assert!(!has_download_anchor(&missing));
        assert_eq!(first_href(&ok).as_deref(), Some("/minecraft/download"));
        assert_eq!(first_href(&no_href), None);
    }

    #[test]
    fn test_download_page_validator() {
        let payload = Html::parse_document(r#"<script id="__NUXT_DATA__">[]</script>"#);
        let manual = Html::parse_document(r#"<div class="download-btn-box"></div>"#);
        let neither = Html::parse_document("<p>loading</p>");
        assert!(is_download_page(&payload));
        assert!(is_download_page(&manual));
        assert!(!is_download_page(&neither));
    }
}
