//! Core data types for listing entries, fetch targets, and search results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel used in [`ResultRecord::download`] when no links were found.
pub const NOT_FOUND: &str = "Not Found";

/// One row scraped from a search listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    pub detail_url: String,
    pub image_url: String,
    pub size_text: String,
}

/// Whether a request goes through the translation mirror or straight to the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Direct,
    Proxied,
}

/// A URL together with the way it is being addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub mode: FetchMode,
}

impl FetchTarget {
    pub fn proxied(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: FetchMode::Proxied,
        }
    }

    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: FetchMode::Direct,
        }
    }
}

/// A fully resolved search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub name: String,
    pub link: String,
    pub image: String,
    /// Comma-space joined download links, or [`NOT_FOUND`].
    pub download: String,
    pub size: String,
}

impl ResultRecord {
    /// True when resolution succeeded but the page carried no file links.
    pub fn is_not_found(&self) -> bool {
        self.download == NOT_FOUND
    }
}

/// Pipeline stage in which an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    Detail,
    Download,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStage::Detail => f.write_str("detail"),
            ResolutionStage::Download => f.write_str("download"),
        }
    }
}

/// A listing entry that could not be resolved, reported next to the successes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("item '{name}' failed at {stage} stage: {reason}")]
pub struct ItemFailure {
    pub name: String,
    pub link: String,
    pub stage: ResolutionStage,
    pub reason: String,
}

/// Aggregate response for one search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub limit: usize,
    pub count: usize,
    pub results: Vec<ResultRecord>,
    pub failed: usize,
    pub failures: Vec<ItemFailure>,
}

impl SearchResponse {
    pub fn new(query: &str, limit: usize, results: Vec<ResultRecord>, failures: Vec<ItemFailure>) -> Self {
        Self {
            success: true,
            query: query.to_string(),
            limit,
            count: results.len(),
            results,
            failed: failures.len(),
            failures,
        }
    }
}

/// Why a single fetch attempt did not produce an acceptable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Connection, DNS, timeout, or a 5xx/408 answer.
    TransientNetwork(String),
    /// 429 received while already addressing the site directly.
    UpstreamRateLimited,
    /// A 4xx status unrelated to rate limiting.
    Rejected(u16),
    /// The response parsed but the validator did not accept it.
    Invalid,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::TransientNetwork(msg) => write!(f, "network error: {msg}"),
            AttemptFailure::UpstreamRateLimited => f.write_str("rate limited"),
            AttemptFailure::Rejected(status) => write!(f, "rejected with HTTP {status}"),
            AttemptFailure::Invalid => f.write_str("response did not validate"),
        }
    }
}

/// Errors that cross component boundaries.
#[derive(thiserror::Error, Debug)]
pub enum ScoutError {
    #[error("gave up on {url} after {attempts} attempts ({last_failure})")]
    ValidationTimeout {
        url: String,
        attempts: u32,
        last_failure: AttemptFailure,
    },

    #[error("upstream rejected {url} with HTTP {status}")]
    UpstreamRejected { url: String, status: u16 },

    /// The request could never succeed: malformed URL or a redirect loop.
    #[error("cannot fetch {url}: {reason}")]
    Unfetchable { url: String, reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Convenience result type.
pub type ScoutResult<T> = Result<T, ScoutError>;
