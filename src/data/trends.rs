use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use reqwest::{Client, Url};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use crate::analytics::history::{self, DEFAULT_POINTS, FALLBACK_VOLATILITY};
use crate::data::cache::{Lookup, StalePolicy, TtlCache};
use crate::data::types::TrendsResponse;

const MAX_KEYWORD_LEN: usize = 100;
const FALLBACK_INDEX: f64 = 50.0;

/// Per-keyword search-interest series.
///
/// Implementations never fail: on any upstream problem they return a
/// response with `is_real = false` and a synthesized, non-empty history.
#[async_trait]
pub trait SearchInterestSource: Send + Sync {
    async fn interest(&self, keyword: &str) -> TrendsResponse;
}

/// Strip everything but ASCII word characters, whitespace, `-`, `.` and `,`,
/// then cap the length. The result is passed to a subprocess as one argv entry.
pub fn sanitize_keyword(keyword: &str) -> Result<String> {
    let re = Regex::new(r"[^A-Za-z0-9_\s\-.,]")?;
    Ok(re
        .replace_all(keyword, "")
        .chars()
        .take(MAX_KEYWORD_LEN)
        .collect())
}

/// Placeholder response for a keyword whose real series is unavailable.
pub fn fallback_response<R: Rng + ?Sized>(
    rng: &mut R,
    keyword: &str,
    current_index: f64,
    error: String,
) -> TrendsResponse {
    TrendsResponse {
        keyword: keyword.to_string(),
        current_index,
        history: history::synthesize_history(
            rng,
            FALLBACK_INDEX,
            FALLBACK_VOLATILITY,
            DEFAULT_POINTS,
            history::today(),
        ),
        is_real: false,
        error: Some(error),
        from_cache: false,
    }
}

/// Keep the non-empty-history contract for synthetic responses.
fn ensure_history(mut response: TrendsResponse) -> TrendsResponse {
    if !response.is_real && response.history.is_empty() {
        response.history = history::synthesize_history(
            &mut rand::thread_rng(),
            response.current_index,
            FALLBACK_VOLATILITY,
            DEFAULT_POINTS,
            history::today(),
        );
    }
    response
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to start trends fetcher: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("trends fetcher timed out after {0:?}")]
    Timeout(Duration),

    #[error("trends fetcher exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("trends fetcher printed invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runs the external trends fetcher (e.g. `python3 scripts/googleTrends.py`)
/// once per keyword, caching its output for the TTL.
pub struct ScriptTrendsClient {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    cache: TtlCache<TrendsResponse>,
}

impl ScriptTrendsClient {
    pub fn new(program: String, args: Vec<String>, timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
            cache: TtlCache::new(cache_ttl, StalePolicy::Evict),
        }
    }

    async fn run_script(&self, keyword: &str) -> Result<TrendsResponse, ScriptError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(keyword)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScriptError::Timeout(self.timeout))??;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ScriptError::Exit {
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!(keyword, "Trends fetcher stderr: {}", stderr);
        }

        let response: TrendsResponse = serde_json::from_slice(&output.stdout)?;
        Ok(ensure_history(response))
    }
}

#[async_trait]
impl SearchInterestSource for ScriptTrendsClient {
    async fn interest(&self, keyword: &str) -> TrendsResponse {
        let sanitized = match sanitize_keyword(keyword) {
            Ok(s) => s,
            Err(e) => {
                return fallback_response(&mut rand::thread_rng(), keyword, FALLBACK_INDEX, e.to_string())
            }
        };
        let cache_key = sanitized.to_lowercase();

        match self
            .cache
            .get_or_fetch(&cache_key, || self.run_script(&sanitized))
            .await
        {
            Ok(Lookup::Hit(mut response)) => {
                debug!(keyword = %sanitized, "Trends cache hit");
                response.from_cache = true;
                response
            }
            Ok(lookup) => lookup.into_inner(),
            Err(e) => {
                warn!(keyword = %sanitized, "Google Trends error: {}", e);
                let index = FALLBACK_INDEX + rand::thread_rng().gen_range(0..30) as f64;
                fallback_response(&mut rand::thread_rng(), &sanitized, index, e.to_string())
            }
        }
    }
}

/// Fetches series from an HTTP shim exposing `GET /api/trends/{keyword}`.
pub struct ProxyTrendsClient {
    client: Client,
    base_url: String,
}

impl ProxyTrendsClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client, using defaults");
            Client::new()
        });

        Self { client, base_url }
    }

    fn trends_url(&self, keyword: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid trends proxy URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Trends proxy URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["api", "trends", keyword]);
        Ok(url)
    }

    async fn fetch(&self, keyword: &str) -> Result<TrendsResponse> {
        let url = self.trends_url(keyword)?;
        let response: TrendsResponse = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch trends")?
            .error_for_status()
            .context("Trends proxy returned an error status")?
            .json()
            .await
            .context("Failed to parse trends response")?;
        Ok(ensure_history(response))
    }
}

#[async_trait]
impl SearchInterestSource for ProxyTrendsClient {
    async fn interest(&self, keyword: &str) -> TrendsResponse {
        match self.fetch(keyword).await {
            Ok(response) => {
                if response.is_real {
                    info!(keyword, index = response.current_index, "Trends series loaded");
                }
                response
            }
            Err(e) => {
                warn!(keyword, "Google Trends error: {:#}", e);
                fallback_response(
                    &mut rand::thread_rng(),
                    keyword,
                    FALLBACK_INDEX,
                    "Failed to fetch trends data".to_string(),
                )
            }
        }
    }
}
