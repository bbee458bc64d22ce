//! Structured-data (JSON-LD) offer extraction
//!
//! Item pages embed one or more `application/ld+json` blocks. The first entity of
//! a recognized classified-ad/offer/product type is the higher-trust source for
//! title, price, currency, posting date and location.

use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use super::{ParsingError, ParsingResult, compile_selector};
use crate::domain::StructuredOffer;
use crate::utils::parse_locale_number;

/// Entity types that describe the listing itself
pub const RECOGNIZED_TYPES: &[&str] = &["Product", "Offer", "ClassifiedAd", "OfferForLease"];

const DEFAULT_SCRIPT_SELECTOR: &str = "script[type=\"application/ld+json\"]";

/// Keys that may carry the location, in priority order
const LOCATION_KEYS: &[&str] = &["areaServed", "address", "availableAtOrFrom"];

/// Address parts joined into the location string, in output order
const LOCATION_PARTS: &[&str] = &["addressLocality", "addressRegion", "addressCountry", "name"];

pub struct StructuredDataExtractor {
    script_selector: Selector,
}

impl StructuredDataExtractor {
    pub fn new() -> ParsingResult<Self> {
        Self::with_selector(DEFAULT_SCRIPT_SELECTOR)
    }

    pub fn with_selector(selector: &str) -> ParsingResult<Self> {
        Ok(Self {
            script_selector: compile_selector("structured_data", selector)?,
        })
    }

    /// Offer fields of the first recognized entity on the page, if any.
    pub fn extract(&self, html: &Html) -> Option<StructuredOffer> {
        self.find_entity(html).map(|entity| offer_from_entity(&entity))
    }

    pub fn extract_from_str(&self, body: &str) -> Option<StructuredOffer> {
        self.extract(&Html::parse_document(body))
    }

    fn find_entity(&self, html: &Html) -> Option<Map<String, Value>> {
        for (index, script) in html.select(&self.script_selector).enumerate() {
            let raw = script.text().collect::<String>();
            let raw = raw.trim().trim_start_matches('\u{feff}');
            if raw.is_empty() {
                continue;
            }

            let data = match parse_block(raw) {
                Ok(data) => data,
                Err(e) => {
                    debug!("Skipping structured-data block {}: {}", index, e);
                    continue;
                }
            };

            let candidates = match data {
                Value::Array(items) => items,
                other => vec![other],
            };
            for candidate in candidates {
                if let Value::Object(entity) = candidate {
                    if is_recognized(&entity) {
                        return Some(entity);
                    }
                }
            }
        }
        None
    }
}

/// Parse a block, retrying once with `//` line comments removed.
pub fn parse_block(raw: &str) -> ParsingResult<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(first) => serde_json::from_str(&strip_line_comments(raw)).map_err(|second| {
            ParsingError::StructuredDataMalformed {
                reason: format!("{first}; after comment removal: {second}"),
            }
        }),
    }
}

/// Remove `//` comments running to end of line, leaving string literals intact.
pub fn strip_line_comments(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn is_recognized(entity: &Map<String, Value>) -> bool {
    match entity.get("@type") {
        Some(Value::String(kind)) => RECOGNIZED_TYPES.contains(&kind.as_str()),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| RECOGNIZED_TYPES.contains(&kind)),
        _ => false,
    }
}

fn offer_from_entity(entity: &Map<String, Value>) -> StructuredOffer {
    let offer = offer_node(entity);
    let spec = offer.and_then(|o| first_object(o.get("priceSpecification")));

    let price = spec
        .and_then(|s| number_field(s, "price"))
        .or_else(|| offer.and_then(|o| number_field(o, "price")));
    let currency = spec
        .and_then(|s| text_field(s, "priceCurrency"))
        .or_else(|| offer.and_then(|o| text_field(o, "priceCurrency")));

    StructuredOffer {
        title: text_field(entity, "name").or_else(|| text_field(entity, "headline")),
        price,
        currency,
        date_posted: text_field(entity, "datePosted").or_else(|| text_field(entity, "datePublished")),
        location: location(entity),
    }
}

/// `offers` (object or first of a list); the entity itself carries a flat price otherwise.
fn offer_node(entity: &Map<String, Value>) -> Option<&Map<String, Value>> {
    match entity.get("offers") {
        Some(offers) => first_object(Some(offers)),
        None => Some(entity),
    }
}

fn first_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    match value? {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn number_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_locale_number(s),
        _ => None,
    }
}

fn location(entity: &Map<String, Value>) -> Option<String> {
    let value = LOCATION_KEYS
        .iter()
        .filter_map(|key| entity.get(*key))
        .find(|v| !v.is_null())?;

    match value {
        Value::Object(place) => {
            let joined = LOCATION_PARTS
                .iter()
                .filter_map(|part| text_field(place, part))
                .collect::<Vec<_>>()
                .join(", ");
            Some(joined).filter(|s| !s.is_empty())
        }
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    }
}
