//! Batch state machine: validate, acquire, normalize, filter, publish.
//!
//! Only two things can fail a batch: a malformed request (400) and a
//! storage failure while publishing (500). Every per-identifier failure is
//! absorbed by the fallback chain, so acquisition always yields exactly one
//! record per distinct identifier, in request order.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde_json::Value;
use stockscraper_api::FetchError;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::ScraperConfig;
use crate::error::InvocationError;
use crate::fallback;
use crate::filter::filter_by_date;
use crate::invocation::{
    InvocationResponse, PublishedData, ScrapeRequest, SuccessBody, ValidatedRequest,
    SUCCESS_MESSAGE,
};
use crate::normalize::normalize_all;
use crate::publish::{describe_ttl, OutputFormat, Published, Publisher};
use crate::record::Record;
use crate::scrape::{AcquireError, Scraper};
use crate::store::BlobStore;

/// Terminal error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    PublishFailed,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Acquiring,
    Normalizing,
    Filtering,
    Publishing,
    Done,
    Error(ErrorKind),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validating => f.write_str("validating"),
            Stage::Acquiring => f.write_str("acquiring"),
            Stage::Normalizing => f.write_str("normalizing"),
            Stage::Filtering => f.write_str("filtering"),
            Stage::Publishing => f.write_str("publishing"),
            Stage::Done => f.write_str("done"),
            Stage::Error(kind) => write!(f, "error({:?})", kind),
        }
    }
}

impl From<&InvocationError> for ErrorKind {
    fn from(err: &InvocationError) -> Self {
        match err {
            InvocationError::Validation(_) => ErrorKind::Validation,
            InvocationError::Publish(_) => ErrorKind::PublishFailed,
            InvocationError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Result of a successful batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub request: ValidatedRequest,
    /// Records as published, after normalization and filtering.
    pub records: Vec<Record>,
    pub published: Published,
}

pub struct Orchestrator<S> {
    scraper: Arc<Scraper>,
    publisher: Publisher<S>,
    config: ScraperConfig,
}

impl<S: BlobStore> Orchestrator<S> {
    /// Builds the scraper and publisher described by `config`.
    pub fn new(config: ScraperConfig, store: S) -> Result<Self, FetchError> {
        let scraper = Scraper::from_config(&config)?;
        Ok(Self::with_scraper(config, scraper, store))
    }

    pub fn with_scraper(config: ScraperConfig, scraper: Scraper, store: S) -> Self {
        let publisher =
            Publisher::new(store, &config.bucket, &config.region).with_ttl(config.url_ttl);
        Self {
            scraper: Arc::new(scraper),
            publisher,
            config,
        }
    }

    pub fn publisher(&self) -> &Publisher<S> {
        &self.publisher
    }

    /// Handles a raw invocation event.
    pub async fn handle(&self, event: &Value) -> InvocationResponse {
        match ScrapeRequest::from_event(event) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                let err = InvocationError::from(e);
                tracing::warn!(stage = %Stage::Error(ErrorKind::from(&err)), "{}", err);
                InvocationResponse::error(err.status_code(), &err.public_message())
            }
        }
    }

    /// Runs a decoded request and turns the result into a response.
    ///
    /// Panics inside the pipeline are caught here and reported as 500s.
    pub async fn handle_request(&self, request: ScrapeRequest) -> InvocationResponse {
        let result = match AssertUnwindSafe(self.run(request)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(InvocationError::Internal(panic_message(&panic))),
        };

        match result {
            Ok(outcome) => InvocationResponse::ok(&self.success_body(&outcome)),
            Err(err) => {
                match &err {
                    InvocationError::Validation(_) => tracing::warn!("{}", err),
                    _ => tracing::error!("{}", err),
                }
                InvocationResponse::error(err.status_code(), &err.public_message())
            }
        }
    }

    /// Drives one batch through every stage.
    pub async fn run(&self, request: ScrapeRequest) -> Result<BatchOutcome, InvocationError> {
        enter(Stage::Validating);
        let validated = request.validate().map_err(|e| {
            enter(Stage::Error(ErrorKind::Validation));
            InvocationError::from(e)
        })?;

        enter(Stage::Acquiring);
        let records = self.acquire_all(&validated.identifiers).await;
        let degraded = records.iter().filter(|r| r.is_degraded()).count();
        tracing::info!(
            "acquired {} record(s), {} from fallback",
            records.len(),
            degraded
        );

        enter(Stage::Normalizing);
        let records = normalize_all(records);

        enter(Stage::Filtering);
        let before = records.len();
        let records = filter_by_date(records, &validated.range);
        if records.len() != before {
            tracing::info!(
                "date filter kept {} of {} record(s)",
                records.len(),
                before
            );
        }

        enter(Stage::Publishing);
        let key = object_key(&validated.identifiers, Utc::now(), validated.format);
        let published = self
            .publisher
            .publish(&records, &key, validated.format)
            .await
            .map_err(|e| {
                enter(Stage::Error(ErrorKind::PublishFailed));
                InvocationError::from(e)
            })?;

        enter(Stage::Done);
        Ok(BatchOutcome {
            request: validated,
            records,
            published,
        })
    }

    /// Acquires every identifier on a bounded pool.
    ///
    /// The returned vector has one record per identifier, in the same order.
    pub async fn acquire_all(&self, identifiers: &[String]) -> Vec<Record> {
        let permits = self.config.concurrency.clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let deadline = self
            .config
            .deadline
            .and_then(|budget| Instant::now().checked_add(budget));
        let mut join_set = JoinSet::new();

        for (index, identifier) in identifiers.iter().cloned().enumerate() {
            let sem = Arc::clone(&semaphore);
            let scraper = Arc::clone(&self.scraper);

            join_set.spawn(async move {
                let work = async {
                    // The pool's semaphore is never closed
                    let _permit = sem.acquire().await.ok();
                    scraper.acquire(&identifier).await
                };
                let result = match deadline {
                    Some(at) => tokio::time::timeout_at(at, work)
                        .await
                        .unwrap_or_else(|_| Err(AcquireError::DeadlineExceeded)),
                    None => work.await,
                };
                (index, fallback::resolve(&identifier, result))
            });
        }

        let mut slots: Vec<Option<Record>> = vec![None; identifiers.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, record)) => slots[index] = Some(record),
                Err(e) => tracing::error!("acquisition task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(identifiers)
            .map(|(slot, identifier)| slot.unwrap_or_else(|| fallback::fallback_record(identifier)))
            .collect()
    }

    fn success_body(&self, outcome: &BatchOutcome) -> SuccessBody {
        SuccessBody {
            message: SUCCESS_MESSAGE.to_string(),
            data: PublishedData {
                s3_uri: outcome.published.reference.clone(),
                download_url: outcome.published.access_url.clone(),
                expiration: describe_ttl(outcome.published.expires_in),
                stock_symbols: outcome.request.requested.clone(),
                start_date: outcome.request.start_date.clone(),
                end_date: outcome.request.end_date.clone(),
                output_format: outcome.request.format.to_string(),
            },
        }
    }
}

fn enter(stage: Stage) {
    tracing::info!(stage = %stage, "entering stage");
}

/// Byte budget for the identifier part of an object key.
pub const KEY_IDS_MAX_BYTES: usize = 100;

/// Object key for a batch: `data/stock_data_<ids>_<YYYYmmddHHMMSS>.<ext>`.
///
/// Identifiers are joined with `-` until [`KEY_IDS_MAX_BYTES`] is reached;
/// the rest are summarized as `-and-<k>-more`.
pub fn object_key(identifiers: &[String], now: DateTime<Utc>, format: OutputFormat) -> String {
    format!(
        "data/stock_data_{}_{}.{}",
        key_ids(identifiers),
        now.format("%Y%m%d%H%M%S"),
        format.extension()
    )
}

fn key_ids(identifiers: &[String]) -> String {
    let mut joined = String::new();
    let mut used = 0;
    for id in identifiers {
        let part = sanitize_key_part(id);
        let sep = if joined.is_empty() { 0 } else { 1 };
        if joined.len() + sep + part.len() > KEY_IDS_MAX_BYTES {
            break;
        }
        if sep == 1 {
            joined.push('-');
        }
        joined.push_str(&part);
        used += 1;
    }

    if used == 0 {
        // First identifier alone is over budget; sanitized text is ASCII
        if let Some(first) = identifiers.first() {
            joined = sanitize_key_part(first);
            joined.truncate(KEY_IDS_MAX_BYTES);
            used = 1;
        }
    }

    let rest = identifiers.len() - used;
    if rest > 0 {
        joined.push_str(&format!("-and-{}-more", rest));
    }
    joined
}

fn sanitize_key_part(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "internal error".to_string()
    }
}
