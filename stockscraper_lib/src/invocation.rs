//! Request and response shapes at the invocation boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::DateRange;
use crate::publish::OutputFormat;

pub const SUCCESS_MESSAGE: &str = "Stock data scraped successfully";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("No stock symbols provided")]
    NoSymbols,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Body of a scrape invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub stock_symbols: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
}

impl ScrapeRequest {
    pub fn new<I, T>(symbols: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            stock_symbols: Some(symbols.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_dates(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.start_date = start.map(str::to_string);
        self.end_date = end.map(str::to_string);
        self
    }

    pub fn with_output_format(mut self, format: &str) -> Self {
        self.output_format = Some(format.to_string());
        self
    }

    /// Decodes a request from an invocation event.
    ///
    /// Accepts the bare request object or an envelope whose `body` holds the
    /// request either as an object or as a JSON string.
    pub fn from_event(event: &Value) -> Result<Self, ValidationError> {
        let invalid = |e: serde_json::Error| ValidationError::InvalidRequest(e.to_string());
        match event.get("body") {
            Some(Value::String(raw)) => serde_json::from_str(raw).map_err(invalid),
            Some(Value::Null) => Ok(Self::default()),
            Some(body) => serde_json::from_value(body.clone()).map_err(invalid),
            None => serde_json::from_value(event.clone()).map_err(invalid),
        }
    }

    /// Checks the request shape and resolves identifiers, dates and format.
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let requested = self.stock_symbols.clone().unwrap_or_default();
        let mut identifiers: Vec<String> = Vec::with_capacity(requested.len());
        for symbol in &requested {
            let trimmed = symbol.trim();
            if !trimmed.is_empty() && !identifiers.iter().any(|s| s == trimmed) {
                identifiers.push(trimmed.to_string());
            }
        }
        if identifiers.is_empty() {
            return Err(ValidationError::NoSymbols);
        }

        let format_name = self
            .output_format
            .as_deref()
            .unwrap_or("json")
            .trim()
            .to_ascii_lowercase();
        let format = format_name
            .parse::<OutputFormat>()
            .map_err(|_| ValidationError::UnsupportedFormat(format_name.clone()))?;

        let range = match DateRange::parse(self.start_date.as_deref(), self.end_date.as_deref()) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!("{}; skipping date filtering", e);
                DateRange::unbounded()
            }
        };

        Ok(ValidatedRequest {
            requested,
            identifiers,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            range,
            format,
        })
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// Symbols exactly as the caller sent them.
    pub requested: Vec<String>,
    /// Distinct, trimmed identifiers in request order.
    pub identifiers: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub range: DateRange,
    pub format: OutputFormat,
}

/// Transport-level response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded body.
    pub body: String,
}

impl InvocationResponse {
    pub fn ok(body: &SuccessBody) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self {
                status_code: 200,
                body,
            },
            Err(e) => Self::error(500, &format!("An error occurred: {}", e)),
        }
    }

    pub fn error(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Parses the body back into JSON.
    pub fn body_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessBody {
    pub message: String,
    pub data: PublishedData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedData {
    pub s3_uri: String,
    pub download_url: String,
    pub expiration: String,
    pub stock_symbols: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub output_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_string_body_envelope() {
        let event = json!({
            "body": "{\"stock_symbols\":[\"nike\"],\"output_format\":\"csv\"}"
        });
        let req = ScrapeRequest::from_event(&event).unwrap();
        assert_eq!(req.stock_symbols, Some(vec!["nike".to_string()]));
        assert_eq!(req.output_format.as_deref(), Some("csv"));
    }

    #[test]
    fn decodes_object_body_and_bare_request() {
        let wrapped = json!({ "body": { "stock_symbols": ["a"] } });
        let bare = json!({ "stock_symbols": ["a"] });
        assert_eq!(
            ScrapeRequest::from_event(&wrapped).unwrap(),
            ScrapeRequest::from_event(&bare).unwrap()
        );
    }

    #[test]
    fn malformed_body_is_invalid_request() {
        let event = json!({ "body": "{not json" });
        assert!(matches!(
            ScrapeRequest::from_event(&event),
            Err(ValidationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn empty_or_missing_symbols_rejected() {
        assert_eq!(
            ScrapeRequest::default().validate(),
            Err(ValidationError::NoSymbols)
        );
        assert_eq!(
            ScrapeRequest::new(Vec::<String>::new()).validate(),
            Err(ValidationError::NoSymbols)
        );
        assert_eq!(
            ScrapeRequest::new(["", "   "]).validate(),
            Err(ValidationError::NoSymbols)
        );
    }

    #[test]
    fn identifiers_are_trimmed_and_deduplicated() {
        let v = ScrapeRequest::new(["nike", " msft ", "nike", "msft"])
            .validate()
            .unwrap();
        assert_eq!(v.identifiers, vec!["nike", "msft"]);
        assert_eq!(v.requested.len(), 4);
        assert_eq!(v.format, OutputFormat::Json);
    }

    #[test]
    fn output_format_is_case_insensitive() {
        let v = ScrapeRequest::new(["a"])
            .with_output_format("CSV")
            .validate()
            .unwrap();
        assert_eq!(v.format, OutputFormat::Csv);
    }

    #[test]
    fn unsupported_format_rejected() {
        let err = ScrapeRequest::new(["a"])
            .with_output_format("xml")
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedFormat("xml".into()));
        assert_eq!(err.to_string(), "Unsupported output format: xml");
    }

    #[test]
    fn bad_dates_disable_filtering() {
        let v = ScrapeRequest::new(["a"])
            .with_dates(Some("yesterday"), Some("2023-02-25"))
            .validate()
            .unwrap();
        assert!(v.range.is_unbounded());
        assert_eq!(v.start_date.as_deref(), Some("yesterday"));
    }

    #[test]
    fn response_serializes_status_code_key() {
        let resp = InvocationResponse::error(400, "No stock symbols provided");
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["statusCode"], 400);
        assert_eq!(
            resp.body_json().unwrap(),
            json!({ "error": "No stock symbols provided" })
        );
    }
}
