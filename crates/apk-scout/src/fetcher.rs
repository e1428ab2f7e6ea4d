//! Persistent fetch-until-valid.
//!
//! A page is only returned once a caller-supplied validator accepts the
//! parsed document, because the translation mirror routinely answers with
//! placeholders, interstitials and truncated pages under a 200 status.
//!
//! Attempt outcomes are classified:
//! - 429 through the mirror switches the target to the direct URL once,
//!   without consuming an attempt;
//! - transport errors, 408, 5xx, 429 while direct and validator rejections
//!   are retried with jittered exponential backoff;
//! - any other 4xx is confirmed once and then fails fast;
//! - malformed URLs and redirect loops fail on the first attempt.
//!
//! The attempt count and the elapsed time are both capped by [`FetchPolicy`].

use rand::Rng;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{HttpClient, HttpResponse};
use crate::config::FetchPolicy;
use crate::normalize::Normalizer;
use crate::types::{AttemptFailure, FetchMode, FetchTarget, ScoutError, ScoutResult};

/// A fetched response that passed validation.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL of the accepted request (direct form if the fetch switched modes).
    pub requested_url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
    pub mode: FetchMode,
    /// Attempts spent, not counting the mode switch.
    pub attempts: u32,
}

impl Page {
    /// Parse the body into a queryable document.
    ///
    /// The document is not `Send`; parse it inside synchronous code and
    /// drop it before the next await.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Fetches a target repeatedly until its content validates or the budget runs out.
#[derive(Clone)]
pub struct Fetcher {
    http: HttpClient,
    normalizer: Arc<Normalizer>,
    policy: FetchPolicy,
}

impl Fetcher {
    pub fn new(http: HttpClient, normalizer: Arc<Normalizer>, policy: FetchPolicy) -> Self {
        Self {
            http,
            normalizer,
            policy,
        }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// GET `target` until `validate` accepts the parsed response.
    pub async fn fetch_until_valid<V>(&self, mut target: FetchTarget, validate: V) -> ScoutResult<Page>
    where
        V: Fn(&Html) -> bool,
    {
        let started = Instant::now();
        let budget = self.policy.time_budget();
        let mut attempts = 0u32;
        let mut last_failure = AttemptFailure::Invalid;

        loop {
            if attempts >= self.policy.max_attempts || started.elapsed() >= budget {
                warn!(
                    url = %target.url,
                    attempts,
                    last_failure = %last_failure,
                    "fetch budget exhausted"
                );
                return Err(ScoutError::ValidationTimeout {
                    url: target.url,
                    attempts,
                    last_failure,
                });
            }
            attempts += 1;

            let failure = match self.http.get(&target.url).await {
                Ok(resp) if resp.status == 429 && target.mode == FetchMode::Proxied => {
                    let direct = self.normalizer.normalize(&target.url);
                    info!(from = %target.url, to = %direct, "mirror rate limited, switching to direct");
                    target = FetchTarget::direct(direct);
                    attempts -= 1;
                    continue;
                }
                Ok(resp) => match evaluate(&resp, &validate) {
                    Ok(()) => {
                        debug!(url = %target.url, attempts, "page accepted");
                        return Ok(Page {
                            requested_url: resp.url,
                            final_url: resp.final_url,
                            status: resp.status,
                            body: resp.body,
                            mode: target.mode,
                            attempts,
                        });
                    }
                    Err(failure) => failure,
                },
                Err(e) if is_permanent(&e) => {
                    warn!(url = %target.url, error = %e, "request cannot succeed, not retrying");
                    return Err(ScoutError::Unfetchable {
                        url: target.url,
                        reason: e.to_string(),
                    });
                }
                Err(e) => AttemptFailure::TransientNetwork(e.to_string()),
            };

            if let AttemptFailure::Rejected(status) = failure {
                if matches!(last_failure, AttemptFailure::Rejected(_)) {
                    warn!(url = %target.url, status, "upstream rejected request twice, giving up");
                    return Err(ScoutError::UpstreamRejected {
                        url: target.url,
                        status,
                    });
                }
            }

            debug!(url = %target.url, attempt = attempts, failure = %failure, "fetch attempt failed");
            last_failure = failure;

            let remaining = budget.saturating_sub(started.elapsed());
            let delay = jittered(self.policy.backoff(attempts)).min(remaining);
            tokio::time::sleep(delay).await;
        }
    }
}

/// Classify one response. The parsed document never outlives this call.
fn evaluate<V>(resp: &HttpResponse, validate: &V) -> Result<(), AttemptFailure>
where
    V: Fn(&Html) -> bool,
{
    match resp.status {
        429 => Err(AttemptFailure::UpstreamRateLimited),
        408 | 500..=599 => Err(AttemptFailure::TransientNetwork(format!("HTTP {}", resp.status))),
        400..=499 => Err(AttemptFailure::Rejected(resp.status)),
        _ => {
            let doc = Html::parse_document(&resp.body);
            if validate(&doc) {
                Ok(())
            } else {
                Err(AttemptFailure::Invalid)
            }
        }
    }
}

/// Errors that no retry can fix.
fn is_permanent(e: &reqwest::Error) -> bool {
    e.is_builder() || e.is_redirect()
}

/// Equal jitter: half the delay fixed, half uniformly random.
fn jittered(delay: Duration) -> Duration {
    let half_ms = (delay.as_millis() / 2) as u64;
    if half_ms == 0 {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=half_ms);
    Duration::from_millis(half_ms + extra)
}
