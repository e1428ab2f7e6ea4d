//! Server configuration loading and resolution.
//!
//! Precedence for every value: CLI flag, then environment, then default.

use apk_scout::ScoutConfig;

/// Port used when neither `--port` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 7860;

/// Bind host used when `--host` is not given.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Result count used when a request carries no `limit`.
pub const DEFAULT_LIMIT: usize = 5;

/// Largest `limit` a single request may ask for.
pub const DEFAULT_MAX_LIMIT: usize = 50;

/// Settings of the HTTP front end.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl ServerConfig {
    /// Resolve from explicit flags and the process environment.
    pub fn resolve(host: Option<String>, port: Option<u16>, max_limit: Option<usize>) -> Self {
        Self::resolve_with(host, port, max_limit, |key| std::env::var(key).ok())
    }

    /// Resolve from explicit flags and a key lookup.
    pub fn resolve_with<F>(
        host: Option<String>,
        port: Option<u16>,
        max_limit: Option<usize>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = port
            .or_else(|| lookup("PORT").and_then(|p| p.trim().parse().ok()))
            .unwrap_or(DEFAULT_PORT);
        let host = host
            .or_else(|| lookup("APK_SCOUT_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let max_limit = max_limit
            .or_else(|| lookup("APK_SCOUT_MAX_LIMIT").and_then(|v| v.trim().parse().ok()))
            .unwrap_or(DEFAULT_MAX_LIMIT);

        Self {
            host,
            port,
            default_limit: DEFAULT_LIMIT.min(max_limit),
            max_limit,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pipeline configuration from the environment.
pub fn load_scout_config() -> apk_scout::ScoutResult<ScoutConfig> {
    ScoutConfig::from_env()
}
