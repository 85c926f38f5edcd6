//! Field extraction from quote pages.
//!
//! Every target field has an ordered list of locators. The first locator
//! that yields non-empty text wins; a field with no hit gets [`UNAVAILABLE`].
//! Only a missing label fails extraction.

use regex::Regex;
use scraper::{Html, Selector};

use crate::record::{PartialRecord, UNAVAILABLE};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("no label found in document")]
    MissingLabel,
}

/// One way of locating a field.
#[derive(Debug, Clone, Copy)]
enum Locator {
    /// Text of the first element matching a CSS selector.
    Css(&'static str),
    /// Text of the `index`th `span` inside the first element matching `container`.
    NthSpan {
        container: &'static str,
        index: usize,
    },
    /// Value of a `"key": ...` pair inside an embedded JSON state blob.
    Embedded(&'static str),
}

/// Named lookup rule for one field.
#[derive(Debug)]
struct FieldRule {
    name: &'static str,
    locators: &'static [Locator],
}

const PRICE_BLOCK: &str = r#"div[class*="instrument-price_instrument-price"]"#;

const LABEL: FieldRule = FieldRule {
    name: "label",
    locators: &[
        Locator::Css(r#"h1[data-test="instrument-header-title"]"#),
        Locator::Css(r#"h1[class*="instrument-header_title"]"#),
        Locator::Css("h1"),
    ],
};

const PRIMARY: FieldRule = FieldRule {
    name: "primary_value",
    locators: &[
        Locator::Css(r#"[data-test="instrument-price-last"]"#),
        Locator::NthSpan {
            container: PRICE_BLOCK,
            index: 0,
        },
        Locator::Embedded("last"),
    ],
};

const DELTA: FieldRule = FieldRule {
    name: "delta_value",
    locators: &[
        Locator::Css(r#"[data-test="instrument-price-change"]"#),
        Locator::NthSpan {
            container: PRICE_BLOCK,
            index: 2,
        },
        Locator::Embedded("change"),
    ],
};

const PREVIOUS: FieldRule = FieldRule {
    name: "previous_value",
    locators: &[
        Locator::Css(r#"[data-test="prevClose"]"#),
        Locator::Embedded("prevClose"),
    ],
};

const OPEN: FieldRule = FieldRule {
    name: "open_value",
    locators: &[
        Locator::Css(r#"[data-test="open"]"#),
        Locator::Embedded("open"),
    ],
};

const VOLUME: FieldRule = FieldRule {
    name: "volume",
    locators: &[
        Locator::Css(r#"[data-test="volume"]"#),
        Locator::Embedded("volume"),
    ],
};

/// Parses `document` and applies every field rule.
pub fn extract(document: &str) -> Result<PartialRecord, ExtractError> {
    let html = Html::parse_document(document);
    let label = LABEL
        .apply(&html, document)
        .ok_or(ExtractError::MissingLabel)?;

    Ok(PartialRecord {
        label,
        primary_value: PRIMARY.apply_or_unavailable(&html, document),
        delta_value: DELTA.apply_or_unavailable(&html, document),
        previous_value: PREVIOUS.apply_or_unavailable(&html, document),
        open_value: OPEN.apply_or_unavailable(&html, document),
        volume: VOLUME.apply_or_unavailable(&html, document),
    })
}

impl FieldRule {
    fn apply(&self, html: &Html, raw: &str) -> Option<String> {
        let found = self
            .locators
            .iter()
            .find_map(|locator| locator.locate(html, raw));
        if found.is_none() {
            tracing::debug!("field {} not found", self.name);
        }
        found
    }

    fn apply_or_unavailable(&self, html: &Html, raw: &str) -> String {
        self.apply(html, raw)
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }
}

impl Locator {
    fn locate(&self, html: &Html, raw: &str) -> Option<String> {
        match *self {
            Locator::Css(css) => {
                let selector = parse_selector(css)?;
                html.select(&selector)
                    .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                    .find(|text| !text.is_empty())
            }
            Locator::NthSpan { container, index } => {
                let container = parse_selector(container)?;
                let span = parse_selector("span")?;
                let block = html.select(&container).next()?;
                let el = block.select(&span).nth(index)?;
                let text = collapse_whitespace(&el.text().collect::<String>());
                (!text.is_empty()).then_some(text)
            }
            Locator::Embedded(key) => extract_embedded(raw, key),
        }
    }
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("skipping invalid selector {}: {:?}", css, e);
            None
        }
    }
}

fn extract_embedded(raw: &str, key: &str) -> Option<String> {
    let pattern = format!(r#""{}"\s*:\s*"?([+\-]?[\d.,]+)"#, regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT_MARKUP: &str = include_str!("../tests/fixtures/quote_current.html");
    const LEGACY_MARKUP: &str = include_str!("../tests/fixtures/quote_legacy.html");

    #[test]
    fn extracts_current_markup() {
        let rec = extract(CURRENT_MARKUP).unwrap();
        assert_eq!(rec.label, "Nike Inc (NKE)");
        assert_eq!(rec.primary_value, "98.76");
        assert_eq!(rec.delta_value, "+1.23");
        assert_eq!(rec.previous_value, "97.53");
        assert_eq!(rec.open_value, "97.80");
        assert_eq!(rec.volume, "6,532,118");
    }

    #[test]
    fn extracts_legacy_price_block_by_position() {
        let rec = extract(LEGACY_MARKUP).unwrap();
        assert_eq!(rec.label, "Microsoft Corporation (MSFT)");
        assert_eq!(rec.primary_value, "345.67");
        assert_eq!(rec.delta_value, "+5.67");
        assert_eq!(rec.previous_value, UNAVAILABLE);
        assert_eq!(rec.open_value, UNAVAILABLE);
        assert_eq!(rec.volume, UNAVAILABLE);
    }

    #[test]
    fn missing_label_fails() {
        let doc = r#"<html><body><span data-test="instrument-price-last">1.00</span></body></html>"#;
        assert_eq!(extract(doc), Err(ExtractError::MissingLabel));
    }

    #[test]
    fn missing_fields_degrade_to_sentinel() {
        let doc = "<html><body><h1>Acme Corp</h1></body></html>";
        let rec = extract(doc).unwrap();
        assert_eq!(rec.label, "Acme Corp");
        assert_eq!(rec.primary_value, UNAVAILABLE);
        assert_eq!(rec.delta_value, UNAVAILABLE);
        assert_eq!(rec.volume, UNAVAILABLE);
    }

    #[test]
    fn embedded_state_is_used_when_markup_lacks_prices() {
        let doc = r#"<html><body><h1>Acme Corp</h1>
            <script id="__NEXT_DATA__">{"instrument":{"price":{"last": 12.5,"change":"-0.25"}}}</script>
            </body></html>"#;
        let rec = extract(doc).unwrap();
        assert_eq!(rec.primary_value, "12.5");
        assert_eq!(rec.delta_value, "-0.25");
    }

    #[test]
    fn empty_heading_falls_through_to_next_locator() {
        let doc = r#"<html><body><h1 data-test="instrument-header-title">  </h1><h1>Backup Name</h1></body></html>"#;
        let rec = extract(doc).unwrap();
        assert_eq!(rec.label, "Backup Name");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(collapse_whitespace("  Nike \n  Inc  "), "Nike Inc");
    }
}
