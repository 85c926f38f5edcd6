//! Numeric cleaning of scraped values.
//!
//! Grammar, applied in order:
//! 1. drop currency symbols (`$ € £ ¥ ₹`), thousands separators and all whitespace
//! 2. drop `%`
//! 3. `(x)` becomes `-x`
//! 4. parse as `f64`; anything else, including non-finite results, is null

use chrono::Utc;

use crate::record::{FieldValue, Record};

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];

/// Parses a scraped numeric string. Returns `None` rather than failing.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();

    if cleaned.contains('%') {
        cleaned = cleaned.replace('%', "");
    }

    if let Some(inner) = cleaned
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        cleaned = format!("-{}", inner);
    }

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_field(field: Option<FieldValue>) -> Option<FieldValue> {
    match field? {
        FieldValue::Number(n) if n.is_finite() => Some(FieldValue::Number(n)),
        FieldValue::Number(_) => None,
        FieldValue::Text(raw) => clean_numeric(&raw).map(FieldValue::Number),
    }
}

/// Coerces numeric fields and stamps `processed_at`. Never fails.
pub fn normalize(mut record: Record) -> Record {
    record.primary_value = normalize_field(record.primary_value.take());
    record.delta_value = normalize_field(record.delta_value.take());
    record.processed_at = Some(Utc::now().to_rfc3339());
    record
}

pub fn normalize_all(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().map(normalize).collect()
}
