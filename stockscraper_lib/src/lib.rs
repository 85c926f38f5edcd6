//! Library layer for the stock quote scraper: extraction, normalization,
//! date filtering, fallback data, publishing, and the batch orchestrator.
//!
//! Page retrieval lives in the `stockscraper_api` crate; this crate turns
//! fetched documents into published records.

pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod filter;
pub mod invocation;
pub mod normalize;
pub mod orchestrator;
pub mod publish;
pub mod record;
pub mod scrape;
pub mod store;

pub use stockscraper_api;
pub use stockscraper_api::{Client, FetchError, ProxyConfig, RetryPolicy};

pub use config::ScraperConfig;
pub use error::InvocationError;
pub use extract::{extract, ExtractError};
pub use filter::{filter_by_date, DateRange};
pub use invocation::{InvocationResponse, ScrapeRequest, ValidationError};
pub use normalize::{clean_numeric, normalize};
pub use orchestrator::{object_key, BatchOutcome, Orchestrator, Stage};
pub use publish::{OutputFormat, Published, Publisher, PublishError};
pub use record::{FieldValue, PartialRecord, Record};
pub use scrape::{AcquireError, Scraper};
pub use store::{BlobStore, BlobStoreError, FsBlobStore, MemoryBlobStore};
