//! Serialization and publishing of record sets.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;

use crate::record::Record;
use crate::store::{BlobStore, BlobStoreError};

/// Default lifetime of a presigned download link.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to encode records: {0}")]
    Encode(String),
    #[error("blob store error: {0}")]
    Store(#[from] BlobStoreError),
}

/// Encoding of a published record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(PublishError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Where a record set ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub reference: String,
    pub access_url: String,
    pub expires_in: Duration,
}

/// Encodes `records` in `format`.
pub fn encode(records: &[Record], format: OutputFormat) -> Result<Vec<u8>, PublishError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_vec(records).map_err(|e| PublishError::Encode(e.to_string()))
        }
        OutputFormat::Csv => encode_csv(records),
    }
}

/// Header is the field list of the first record; later records fill the
/// same columns, with absent fields left empty.
fn encode_csv(records: &[Record]) -> Result<Vec<u8>, PublishError> {
    let rows = records
        .iter()
        .map(|r| match serde_json::to_value(r) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(PublishError::Encode("record is not an object".into())),
            Err(e) => Err(PublishError::Encode(e.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = first.keys().cloned().collect();

    let mut wtr = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| PublishError::Encode(e.to_string());
    wtr.write_record(&header).map_err(csv_err)?;
    for row in &rows {
        let cells: Vec<String> = header
            .iter()
            .map(|key| row.get(key).map(cell_text).unwrap_or_default())
            .collect();
        wtr.write_record(&cells).map_err(csv_err)?;
    }
    wtr.into_inner()
        .map_err(|e| PublishError::Encode(e.to_string()))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Writes record sets to a bucket and hands back expiring links.
pub struct Publisher<S> {
    store: S,
    bucket: String,
    region: String,
    ttl: Duration,
}

impl<S: BlobStore> Publisher<S> {
    pub fn new(store: S, bucket: &str, region: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            region: region.to_string(),
            ttl: DEFAULT_URL_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the bucket if it does not exist yet.
    pub async fn ensure_bucket(&self) -> Result<(), PublishError> {
        if self.store.exists(&self.bucket).await? {
            tracing::debug!("bucket {} exists", self.bucket);
            return Ok(());
        }
        tracing::info!("bucket {} doesn't exist, creating", self.bucket);
        self.store.create(&self.bucket, &self.region).await?;
        Ok(())
    }

    /// Encodes, stores and presigns `records` under `key`.
    pub async fn publish(
        &self,
        records: &[Record],
        key: &str,
        format: OutputFormat,
    ) -> Result<Published, PublishError> {
        let bytes = encode(records, format)?;
        self.ensure_bucket().await?;
        self.store
            .put(&self.bucket, key, bytes, format.content_type())
            .await?;
        let reference = format!("{}://{}/{}", self.store.scheme(), self.bucket, key);
        tracing::info!("records uploaded to {}", reference);

        let access_url = self.store.presign(&self.bucket, key, self.ttl).await?;
        Ok(Published {
            reference,
            access_url,
            expires_in: self.ttl,
        })
    }

    /// Like [`Publisher::publish`] but takes the format by name.
    pub async fn publish_named(
        &self,
        records: &[Record],
        key: &str,
        format: &str,
    ) -> Result<Published, PublishError> {
        let format = format.parse::<OutputFormat>()?;
        self.publish(records, key, format).await
    }
}

/// Human-readable lifetime, e.g. "1 hour" or "15 minutes".
pub fn describe_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    let plural = |n: u64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };
    if secs >= 3600 && secs % 3600 == 0 {
        plural(secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}
