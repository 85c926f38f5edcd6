//! HTTP client for quote pages.

use std::time::Duration;

use url::Url;

use crate::{
    errors::AttemptError,
    retry::RetryPolicy,
    user_agent::{next_identity, pacing_delay, Identity},
    FetchError,
};

/// Per-attempt request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default scraping-proxy endpoint used when an API key is configured.
pub const DEFAULT_PROXY_ENDPOINT: &str = "http://api.scraperapi.com/";

/// Routes requests through a scraping proxy instead of hitting the target directly.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub api_key: String,
    pub endpoint: String,
}

impl ProxyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

/// A fetched page body.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    pub body: String,
}

/// Client for the quote source.
///
/// Each attempt sends browser-like headers with a freshly rotated identity.
/// Failures of any kind are retried with exponential backoff until the
/// policy's retry budget is spent.
pub struct Client {
    /// Base URL for quote pages. Defaults to `https://www.investing.com`.
    base_url: Url,
    http: reqwest::Client,
    policy: RetryPolicy,
    proxy: Option<ProxyConfig>,
}

impl Client {
    /// Creates a client pointing at the production quote source.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url("https://www.investing.com")
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()?;
        Ok(Self {
            base_url,
            http,
            policy: RetryPolicy::default(),
            proxy: None,
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    /// URL of the quote page for `identifier`.
    ///
    /// The identifier is percent-encoded as a single path segment.
    pub fn quote_url(&self, identifier: &str) -> String {
        let mut url = self.base_url.clone();
        // Base URLs are checked in `with_base_url`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("equities").push(identifier);
        }
        url.to_string()
    }

    /// Fetches `target` using the client's own retry policy.
    pub async fn fetch(&self, target: &str) -> Result<Document, FetchError> {
        self.fetch_with(target, self.policy.max_retries, self.policy.base_delay)
            .await
    }

    /// Fetches `target`, making at most `max_retries + 1` attempts.
    pub async fn fetch_with(
        &self,
        target: &str,
        max_retries: u32,
        base_delay: Duration,
    ) -> Result<Document, FetchError> {
        let url = self.request_url(target)?;
        let mut attempt: u32 = 0;
        loop {
            let identity = next_identity();
            if let Some(pause) = pacing_delay(&self.policy.pacing) {
                tokio::time::sleep(pause).await;
            }

            match self.send(&url, &identity).await {
                Ok(body) => {
                    tracing::debug!("Fetched {} on attempt {}", target, attempt + 1);
                    return Ok(Document {
                        url: target.to_string(),
                        body,
                    });
                }
                Err(err) => {
                    if attempt >= max_retries {
                        tracing::error!(
                            "Giving up on {} after {} attempt(s): {}",
                            target,
                            attempt + 1,
                            err
                        );
                        return Err(FetchError::Exhausted {
                            url: target.to_string(),
                            attempts: attempt + 1,
                            last_error: err.to_string(),
                        });
                    }
                    let delay = self.policy.delay_for_attempt(attempt, base_delay);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:.1}s",
                        target,
                        attempt + 1,
                        max_retries + 1,
                        err,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn request_url(&self, target: &str) -> Result<Url, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: target.to_string(),
            reason,
        };
        let target_url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
        match &self.proxy {
            None => Ok(target_url),
            Some(proxy) => Url::parse_with_params(
                &proxy.endpoint,
                &[("api_key", proxy.api_key.as_str()), ("url", target_url.as_str())],
            )
            .map_err(|e| invalid(format!("bad proxy endpoint: {}", e))),
        }
    }

    async fn send(&self, url: &Url, identity: &Identity) -> Result<String, AttemptError> {
        let resp = self
            .http
            .get(url.clone())
            .header("user-agent", identity.user_agent)
            .header("accept-language", identity.accept_language)
            .header("accept", "text/html,application/xhtml+xml")
            .header("upgrade-insecure-requests", "1")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(AttemptError::Transport)?;

        if !status.is_success() {
            return Err(AttemptError::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
