//! The per-identifier quote record.

use serde::{Deserialize, Serialize};

/// Sentinel written by the extractor when a field cannot be located.
pub const UNAVAILABLE: &str = "N/A";

/// A numeric field that is either still raw text or already parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(raw: impl Into<String>) -> Self {
        Self::Text(raw.into())
    }
}

/// Fields recovered from a quote page before a record is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRecord {
    pub label: String,
    pub primary_value: String,
    pub delta_value: String,
    pub previous_value: String,
    pub open_value: String,
    pub volume: String,
}

/// One quote snapshot.
///
/// Serialized field names keep the column names consumers of the published
/// files already rely on (`symbol`, `company_name`, `current_price`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "symbol")]
    pub identifier: String,
    #[serde(rename = "company_name")]
    pub label: String,
    #[serde(rename = "current_price")]
    pub primary_value: Option<FieldValue>,
    #[serde(rename = "price_change")]
    pub delta_value: Option<FieldValue>,
    #[serde(
        rename = "previous_close",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_value: Option<String>,
    #[serde(rename = "open", default, skip_serializing_if = "Option::is_none")]
    pub open_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(rename = "timestamp")]
    pub captured_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl Record {
    /// Builds a genuine capture from extracted fields.
    ///
    /// Extended fields holding the sentinel are dropped; an empty label falls
    /// back to the identifier.
    pub fn from_partial(identifier: &str, partial: PartialRecord, captured_at: String) -> Self {
        let label = if partial.label.trim().is_empty() {
            identifier.to_string()
        } else {
            partial.label
        };
        Self {
            identifier: identifier.to_string(),
            label,
            primary_value: Some(FieldValue::Text(partial.primary_value)),
            delta_value: Some(FieldValue::Text(partial.delta_value)),
            previous_value: available(partial.previous_value),
            open_value: available(partial.open_value),
            volume: available(partial.volume),
            captured_at,
            processed_at: None,
            degraded: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

fn available(raw: String) -> Option<String> {
    if raw == UNAVAILABLE || raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial() -> PartialRecord {
        PartialRecord {
            label: "Nike Inc".into(),
            primary_value: "98.76".into(),
            delta_value: "+1.23".into(),
            previous_value: "97.53".into(),
            open_value: UNAVAILABLE.into(),
            volume: "".into(),
        }
    }

    #[test]
    fn from_partial_keeps_available_fields() {
        let rec = Record::from_partial("nike", partial(), "2025-05-08T21:30:00Z".into());
        assert_eq!(rec.identifier, "nike");
        assert_eq!(rec.label, "Nike Inc");
        assert_eq!(rec.primary_value, Some(FieldValue::text("98.76")));
        assert_eq!(rec.previous_value.as_deref(), Some("97.53"));
        assert_eq!(rec.open_value, None);
        assert_eq!(rec.volume, None);
        assert!(!rec.is_degraded());
    }

    #[test]
    fn blank_label_defaults_to_identifier() {
        let mut p = partial();
        p.label = "  ".into();
        let rec = Record::from_partial("nike", p, "2025-05-08".into());
        assert_eq!(rec.label, "nike");
    }

    #[test]
    fn serializes_with_published_column_names() {
        let mut rec = Record::from_partial("nike", partial(), "2025-05-08T21:30:00Z".into());
        rec.primary_value = Some(FieldValue::Number(98.76));
        rec.delta_value = None;
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["symbol"], "nike");
        assert_eq!(value["company_name"], "Nike Inc");
        assert_eq!(value["current_price"], 98.76);
        assert!(value["price_change"].is_null());
        assert_eq!(value["timestamp"], "2025-05-08T21:30:00Z");
        assert!(value.get("processed_at").is_none());
        assert!(value.get("degraded").is_none());
        assert!(value.get("open").is_none());
    }

    #[test]
    fn deserializes_raw_and_numeric_values() {
        let json = r#"{"symbol":"x","company_name":"X","current_price":"1.5","price_change":2.0,"timestamp":"t"}"#;
        let rec: Record = serde_json::from_str(json).unwrap();
        assert_eq!(rec.primary_value, Some(FieldValue::text("1.5")));
        assert_eq!(rec.delta_value, Some(FieldValue::Number(2.0)));
    }
}
