//! Search orchestration: paginate the listing, then resolve entries concurrently.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::client::HttpClient;
use crate::config::ScoutConfig;
use crate::fetcher::Fetcher;
use crate::listing::{self, is_search_page};
use crate::normalize::Normalizer;
use crate::resolve::Resolver;
use crate::types::{FetchTarget, ListingEntry, ScoutError, ScoutResult, SearchResponse};

/// Entry point of the pipeline.
///
/// Owns the HTTP client for its whole lifetime; dropping the `Scout`
/// releases the connection pool.
pub struct Scout {
    config: ScoutConfig,
    normalizer: Arc<Normalizer>,
    fetcher: Fetcher,
    resolver: Resolver,
}

impl Scout {
    /// Validate the configuration and build the shared client.
    pub fn new(config: ScoutConfig) -> ScoutResult<Self> {
        config.validate()?;
        let normalizer = Arc::new(Normalizer::new(config.site.clone()));
        let http = HttpClient::new(&config.fetch)?;
        let fetcher = Fetcher::new(http, normalizer.clone(), config.fetch.clone());
        let resolver = Resolver::new(fetcher.clone(), normalizer.clone());
        Ok(Self {
            config,
            normalizer,
            fetcher,
            resolver,
        })
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Search the catalog and resolve up to `limit` matches.
    ///
    /// Failures of individual items are reported in
    /// [`SearchResponse::failures`]; only a failure to load the first
    /// listing page fails the whole call.
    pub async fn search(&self, query: &str, limit: usize) -> ScoutResult<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScoutError::InvalidQuery("query must not be empty".into()));
        }

        let started = Instant::now();
        let entries = self.collect_entries(query, limit).await?;
        info!(query, limit, entries = entries.len(), "listing collected, resolving items");

        // Futures are built up front (they are lazy and only run when the
        // buffered stream polls them) so the stream type carries no
        // higher-ranked closure, which keeps the future `Send` for axum.
        let pending: Vec<_> = entries.iter().map(|entry| self.resolver.resolve(entry)).collect();
        let outcomes: Vec<_> = stream::iter(pending)
            .buffered(self.config.search.concurrency)
            .collect()
            .await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(record) => results.push(record),
                Err(failure) => failures.push(failure),
            }
        }

        info!(
            query,
            resolved = results.len(),
            failed = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(SearchResponse::new(query, limit, results, failures))
    }

    /// Walk listing pages until `limit` entries are collected or the results end.
    pub async fn collect_entries(&self, query: &str, limit: usize) -> ScoutResult<Vec<ListingEntry>> {
        let mut entries: Vec<ListingEntry> = Vec::new();
        let mut page = 1u32;

        while entries.len() < limit {
            if page > self.config.search.max_pages {
                warn!(query, page, "page cap reached, stopping pagination");
                break;
            }

            let canonical = format!(
                "{}{}",
                self.config.site.canonical_base,
                listing::search_path(query, page)
            );
            let target = FetchTarget::proxied(self.normalizer.proxied(&canonical));

            let fetched = match self.fetcher.fetch_until_valid(target, is_search_page).await {
                Ok(fetched) => fetched,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!(query, page, error = %e, "listing page failed, keeping earlier pages");
                    break;
                }
            };

            let (rows, parsed) = {
                let doc = fetched.document();
                let remaining = limit - entries.len();
                (
                    listing::item_count(&doc),
                    listing::parse_entries(&doc, &self.normalizer, remaining),
                )
            };
            if rows == 0 {
                break;
            }

            entries.extend(parsed);
            page += 1;
        }

        Ok(entries)
    }
}
