//! Configuration for the scraping pipeline.
//!
//! Defaults target the live catalog and its translation mirror. Every field
//! can be overridden from a deserialized document or from `APK_SCOUT_*`
//! environment variables via [`ScoutConfig::from_env`].

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::types::{ScoutError, ScoutResult};

/// Canonical site and translation-mirror addressing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and authority of the real site, without a trailing slash.
    pub canonical_base: String,
    /// Scheme and authority of the translation mirror, without a trailing slash.
    pub mirror_base: String,
    /// Query parameters appended to every proxied URL.
    pub translation_params: Vec<(String, String)>,
    /// Name prefix shared by all translation parameters.
    pub translation_param_prefix: String,
    /// Host fragment identifying an indirection wrapper (`?u=<target>`).
    pub indirection_marker: String,
    /// Path fragment of an indirection wrapper.
    pub indirection_path: String,
    /// Query parameter carrying the wrapped target.
    pub indirection_param: String,
    pub max_indirection_depth: usize,
    /// Hosts whose `/download/` links count as file links.
    pub download_hosts: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            canonical_base: "https://gamekillerapp.com".to_string(),
            mirror_base: "https://gamekillerapp-com.translate.goog".to_string(),
            translation_params: vec![
                ("_x_tr_sl".to_string(), "auto".to_string()),
                ("_x_tr_tl".to_string(), "en".to_string()),
                ("_x_tr_hl".to_string(), "en".to_string()),
            ],
            translation_param_prefix: "_x_tr_".to_string(),
            indirection_marker: "google".to_string(),
            indirection_path: "/website".to_string(),
            indirection_param: "u".to_string(),
            max_indirection_depth: 8,
            download_hosts: vec![
                "gamercdn.top".to_string(),
                "cfdownload.willcheat.com".to_string(),
            ],
        }
    }
}

/// Retry budget and HTTP client settings for the persistent fetcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    pub max_attempts: u32,
    pub time_budget_ms: u64,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            time_budget_ms: 90_000,
            base_delay_ms: 250,
            max_delay_ms: 8_000,
            request_timeout_ms: 30_000,
            user_agent: "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36"
                .to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl FetchPolicy {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Search-stage settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of items resolved at the same time.
    pub concurrency: usize,
    /// Hard stop for pagination.
    pub max_pages: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_pages: 20,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub site: SiteConfig,
    pub fetch: FetchPolicy,
    pub search: SearchConfig,
}

impl ScoutConfig {
    /// Defaults overlaid with `APK_SCOUT_*` environment variables.
    pub fn from_env() -> ScoutResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (environment-style names).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ScoutResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("APK_SCOUT_CANONICAL_BASE") {
            self.site.canonical_base = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("APK_SCOUT_MIRROR_BASE") {
            self.site.mirror_base = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("APK_SCOUT_DOWNLOAD_HOSTS") {
            self.site.download_hosts = v
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
        }
        if let Some(v) = lookup("APK_SCOUT_MAX_ATTEMPTS") {
            self.fetch.max_attempts = parse_number("APK_SCOUT_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("APK_SCOUT_TIME_BUDGET_MS") {
            self.fetch.time_budget_ms = parse_number("APK_SCOUT_TIME_BUDGET_MS", &v)?;
        }
        if let Some(v) = lookup("APK_SCOUT_CONCURRENCY") {
            self.search.concurrency = parse_number("APK_SCOUT_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("APK_SCOUT_MAX_PAGES") {
            self.search.max_pages = parse_number("APK_SCOUT_MAX_PAGES", &v)?;
        }
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> ScoutResult<()> {
        for (name, base) in [
            ("canonical_base", &self.site.canonical_base),
            ("mirror_base", &self.site.mirror_base),
        ] {
            let parsed = Url::parse(base)
                .map_err(|e| ScoutError::InvalidConfig(format!("{name} '{base}': {e}")))?;
            if parsed.host_str().is_none() {
                return Err(ScoutError::InvalidConfig(format!("{name} '{base}' has no host")));
            }
        }
        if self.site.translation_param_prefix.is_empty() {
            return Err(ScoutError::InvalidConfig(
                "translation_param_prefix must not be empty".into(),
            ));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ScoutError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        if self.fetch.time_budget_ms == 0 {
            return Err(ScoutError::InvalidConfig("time_budget_ms must be positive".into()));
        }
        if self.search.concurrency == 0 {
            return Err(ScoutError::InvalidConfig("concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ScoutResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ScoutError::InvalidConfig(format!("{key}: '{value}' is not a number")))
}
