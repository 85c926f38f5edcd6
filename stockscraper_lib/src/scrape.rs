//! Per-identifier acquisition: fetch, extract, fall back.

use chrono::Utc;
use stockscraper_api::{Client, FetchError};

use crate::config::ScraperConfig;
use crate::extract::{extract, ExtractError};
use crate::fallback;
use crate::record::Record;

/// Why a genuine capture could not be produced.
#[derive(thiserror::Error, Debug)]
pub enum AcquireError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("deadline reached before acquisition finished")]
    DeadlineExceeded,
}

/// Scrapes quote pages into records.
pub struct Scraper {
    client: Client,
}

impl Scraper {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a scraper from the config's base URL, retry policy and proxy.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::with_base_url(&config.base_url)?
            .with_policy(config.retry.clone())
            .with_proxy(config.proxy());
        Ok(Self::new(client))
    }

    /// Fetches and extracts one quote. No fallback.
    pub async fn acquire(&self, identifier: &str) -> Result<Record, AcquireError> {
        let url = self.client.quote_url(identifier);
        tracing::info!("scraping {} from {}", identifier, url);
        let document = self.client.fetch(&url).await?;
        let captured_at = Utc::now().to_rfc3339();
        let partial = extract(&document.body)?;
        tracing::info!("scraped {} ({})", partial.label, identifier);
        Ok(Record::from_partial(identifier, partial, captured_at))
    }

    /// Acquires one quote, substituting synthetic data on any failure.
    pub async fn acquire_or_fallback(&self, identifier: &str) -> Record {
        fallback::resolve(identifier, self.acquire(identifier).await)
    }
}
