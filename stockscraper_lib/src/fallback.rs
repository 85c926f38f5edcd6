//! Synthetic records used when a quote cannot be acquired.
//!
//! Tier order: known table entry, then a generated placeholder. Neither tier
//! can fail, so every identifier always ends up with a record.

use chrono::Utc;

use crate::record::{FieldValue, Record};

pub const TABLE_MARKER: &str = "fallback_table";
pub const GENERATED_MARKER: &str = "generated";

const PLACEHOLDER_PRICE: &str = "100.00";
const PLACEHOLDER_CHANGE: &str = "+1.00";

struct KnownQuote {
    identifier: &'static str,
    label: &'static str,
    price: &'static str,
    change: &'static str,
}

const KNOWN_QUOTES: &[KnownQuote] = &[
    KnownQuote {
        identifier: "nike",
        label: "Nike Inc",
        price: "98.76",
        change: "+1.23",
    },
    KnownQuote {
        identifier: "coca-cola-co",
        label: "The Coca-Cola Company",
        price: "65.43",
        change: "-0.32",
    },
    KnownQuote {
        identifier: "microsoft-corp",
        label: "Microsoft Corporation",
        price: "345.67",
        change: "+5.67",
    },
];

/// Table entry for `identifier`, if one exists.
pub fn from_table(identifier: &str) -> Option<Record> {
    KNOWN_QUOTES
        .iter()
        .find(|q| q.identifier == identifier)
        .map(|q| {
            synthetic(
                identifier,
                q.label.to_string(),
                q.price,
                q.change,
                TABLE_MARKER,
            )
        })
}

/// Placeholder record named from `identifier`.
pub fn generated(identifier: &str) -> Record {
    synthetic(
        identifier,
        format!("Mock {}", title_case(identifier)),
        PLACEHOLDER_PRICE,
        PLACEHOLDER_CHANGE,
        GENERATED_MARKER,
    )
}

/// Best available synthetic record for `identifier`.
pub fn fallback_record(identifier: &str) -> Record {
    from_table(identifier).unwrap_or_else(|| generated(identifier))
}

/// Returns the acquired record, or a synthetic one when acquisition failed.
pub fn resolve<E: std::fmt::Display>(identifier: &str, acquired: Result<Record, E>) -> Record {
    match acquired {
        Ok(record) => record,
        Err(reason) => {
            let record = fallback_record(identifier);
            tracing::warn!(
                "using {} data for {}: {}",
                record.degraded.as_deref().unwrap_or(GENERATED_MARKER),
                identifier,
                reason
            );
            record
        }
    }
}

fn synthetic(identifier: &str, label: String, price: &str, change: &str, marker: &str) -> Record {
    Record {
        identifier: identifier.to_string(),
        label,
        primary_value: Some(FieldValue::text(price)),
        delta_value: Some(FieldValue::text(change)),
        previous_value: None,
        open_value: None,
        volume: None,
        captured_at: Utc::now().to_rfc3339(),
        processed_at: None,
        degraded: Some(marker.to_string()),
    }
}

/// Upper-cases each letter that follows a non-letter, lower-cases the rest.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_alpha = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
