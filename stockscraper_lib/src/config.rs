//! Explicit runtime configuration for the pipeline.

use std::time::Duration;

use stockscraper_api::{PacingWindow, ProxyConfig, RetryPolicy};

use crate::publish::DEFAULT_URL_TTL;

pub const DEFAULT_BUCKET: &str = "stock-data-bucket";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_BASE_URL: &str = "https://www.investing.com";
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const MAX_CONCURRENCY: usize = 64;
pub const MAX_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);
/// Longest validity a presigned S3 URL may carry.
pub const MAX_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Everything the orchestrator needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub bucket: String,
    pub region: String,
    pub base_url: String,
    pub proxy_api_key: Option<String>,
    pub retry: RetryPolicy,
    /// Upper bound on identifiers acquired at the same time.
    pub concurrency: usize,
    /// Budget for the whole acquisition stage; late identifiers fall back.
    pub deadline: Option<Duration>,
    pub url_ttl: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            proxy_api_key: None,
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
            url_ttl: DEFAULT_URL_TTL,
        }
    }
}

impl ScraperConfig {
    /// Reads overrides from the environment. Unparsable values keep defaults;
    /// out-of-range values are clamped.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_u64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let retry = RetryPolicy {
            max_retries: lookup("STOCKSCRAPER_RETRY_MAX")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(defaults.retry.max_retries),
            base_delay: parse_u64("STOCKSCRAPER_RETRY_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            max_delay: parse_u64("STOCKSCRAPER_RETRY_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay),
            max_jitter: defaults.retry.max_jitter,
            pacing: PacingWindow::default(),
        };

        Self {
            bucket: lookup("S3_BUCKET_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.bucket),
            region: lookup("AWS_REGION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.region),
            base_url: lookup("STOCKSCRAPER_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.base_url),
            proxy_api_key: lookup("SCRAPER_API_KEY").filter(|v| !v.trim().is_empty()),
            retry,
            concurrency: parse_u64("STOCKSCRAPER_CONCURRENCY")
                .map(|n| usize::try_from(n).unwrap_or(MAX_CONCURRENCY).clamp(1, MAX_CONCURRENCY))
                .unwrap_or(defaults.concurrency),
            deadline: parse_u64("STOCKSCRAPER_DEADLINE_SECS")
                .map(|secs| Duration::from_secs(secs).min(MAX_DEADLINE)),
            url_ttl: parse_u64("STOCKSCRAPER_URL_TTL_SECS")
                .map(|secs| Duration::from_secs(secs).min(MAX_URL_TTL))
                .unwrap_or(defaults.url_ttl),
        }
    }

    pub fn proxy(&self) -> Option<ProxyConfig> {
        self.proxy_api_key.as_deref().map(ProxyConfig::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = ScraperConfig::from_lookup(|_| None);
        assert_eq!(cfg.bucket, DEFAULT_BUCKET);
        assert_eq!(cfg.region, DEFAULT_REGION);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.concurrency, DEFAULT_CONCURRENCY);
        assert!(cfg.deadline.is_none());
        assert!(cfg.proxy().is_none());
        assert_eq!(cfg.url_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = ScraperConfig::from_lookup(lookup_from(&[
            ("S3_BUCKET_NAME", "my-bucket"),
            ("AWS_REGION", "eu-west-1"),
            ("SCRAPER_API_KEY", "abc"),
            ("STOCKSCRAPER_RETRY_MAX", "5"),
            ("STOCKSCRAPER_RETRY_BASE_MS", "250"),
            ("STOCKSCRAPER_CONCURRENCY", "8"),
            ("STOCKSCRAPER_DEADLINE_SECS", "20"),
            ("STOCKSCRAPER_URL_TTL_SECS", "600"),
        ]));
        assert_eq!(cfg.bucket, "my-bucket");
        assert_eq!(cfg.region, "eu-west-1");
        assert_eq!(cfg.proxy().unwrap().api_key, "abc");
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.retry.base_delay, Duration::from_millis(250));
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.deadline, Some(Duration::from_secs(20)));
        assert_eq!(cfg.url_ttl, Duration::from_secs(600));
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let cfg = ScraperConfig::from_lookup(lookup_from(&[
            ("STOCKSCRAPER_RETRY_MAX", "lots"),
            ("STOCKSCRAPER_CONCURRENCY", "0"),
            ("SCRAPER_API_KEY", "  "),
        ]));
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.concurrency, 1);
        assert!(cfg.proxy_api_key.is_none());
    }

    #[test]
    fn extreme_values_are_clamped() {
        let cfg = ScraperConfig::from_lookup(lookup_from(&[
            ("STOCKSCRAPER_CONCURRENCY", "18446744073709551615"),
            ("STOCKSCRAPER_DEADLINE_SECS", "18446744073709551615"),
            ("STOCKSCRAPER_URL_TTL_SECS", "18446744073709551615"),
        ]));
        assert_eq!(cfg.concurrency, MAX_CONCURRENCY);
        assert_eq!(cfg.deadline, Some(MAX_DEADLINE));
        assert_eq!(cfg.url_ttl, MAX_URL_TTL);
    }
}
