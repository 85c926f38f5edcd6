//! Inclusive calendar-date filtering of records.

use chrono::NaiveDate;

use crate::record::Record;

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("invalid {bound} date {value:?}, expected YYYY-MM-DD")]
pub struct DateBoundError {
    pub bound: &'static str,
    pub value: String,
}

/// Optional `[start, end]` window. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Parses request bounds in `YYYY-MM-DD` form.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DateBoundError> {
        Ok(Self {
            start: parse_bound("start", start)?,
            end: parse_bound("end", end)?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

fn parse_bound(bound: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, DateBoundError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| DateBoundError {
                bound,
                value: value.to_string(),
            }),
    }
}

/// Calendar date of an ISO-8601 timestamp: the part before `T`.
pub fn captured_date(timestamp: &str) -> Option<NaiveDate> {
    let day = timestamp.trim().split('T').next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Keeps records whose capture date lies in `range`.
///
/// Records with an unparsable `captured_at` are always kept.
pub fn filter_by_date(records: Vec<Record>, range: &DateRange) -> Vec<Record> {
    if range.is_unbounded() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| match captured_date(&record.captured_at) {
            Some(date) => {
                let keep = range.contains(date);
                if !keep {
                    tracing::debug!(
                        "dropping {} captured on {} (outside range)",
                        record.identifier,
                        date
                    );
                }
                keep
            }
            None => {
                tracing::warn!(
                    "could not parse timestamp {:?} for {}, keeping record",
                    record.captured_at,
                    record.identifier
                );
                true
            }
        })
        .collect()
}
