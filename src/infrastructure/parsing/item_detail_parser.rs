//! Item detail parser
//!
//! Reads one item page into an [`ItemRecord`]. Field groups are independent
//! fallible steps: a step that fails is logged and noted in the record's `error`
//! while the remaining steps still run. Price resolution is the last step so that
//! it always sees both the markup price and the structured-data offer.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, warn};

use super::config::ItemSelectors;
use super::param_rules::match_label;
use super::structured_data::StructuredDataExtractor;
use super::{
    ContextualParser, DetailParseContext, ParsingError, ParsingResult, collapsed_text, compile_selector,
    first_text,
};
use crate::domain::{DomPrice, ItemRecord};
use crate::utils::{digits_only, parse_locale_number};

lazy_static! {
    static ref AD_ID_RE: Regex = Regex::new(r"\bID\s+(\d+)").unwrap();
    static ref IMPRESSIONS_RE: Regex = Regex::new(r"(\d[\d\s\u{00A0}]*)").unwrap();
}

const USD_MARKERS: &[&str] = &["usd", "$"];
const LOCAL_CURRENCY_MARKERS: &[&str] = &["сом", "som", "kgs"];

type StepFn = fn(&ItemDetailParser, &Html, &mut ItemRecord) -> ParsingResult<()>;

/// One independently guarded field group
struct FieldStep {
    name: &'static str,
    run: StepFn,
}

/// Parser for extracting the full attribute record from an item page
pub struct ItemDetailParser {
    title: Selector,
    impressions: Selector,
    stat_items: Selector,
    seller_name: Selector,
    pro_badge: Selector,
    phone_mask: Selector,
    params_item: Selector,
    params_label: Selector,
    params_values: Selector,
    description: Selector,
    map_city: Selector,
    date_widgets: Selector,
    date_spans: Selector,
    ad_id: Selector,
    gallery_images: Selector,
    price: Selector,

    structured: StructuredDataExtractor,

    /// Case-insensitive alternation of the known cities; `None` when the list is empty
    city_pattern: Option<Regex>,
}

impl ItemDetailParser {
    /// Steps in execution order; `price` must stay after `structured_data`.
    const STEPS: &'static [FieldStep] = &[
        FieldStep { name: "title", run: Self::read_title },
        FieldStep { name: "statistics", run: Self::read_statistics },
        FieldStep { name: "seller", run: Self::read_seller },
        FieldStep { name: "params", run: Self::read_params },
        FieldStep { name: "description", run: Self::read_description },
        FieldStep { name: "city", run: Self::read_city },
        FieldStep { name: "dates", run: Self::read_dates },
        FieldStep { name: "ad_id", run: Self::read_ad_id },
        FieldStep { name: "images", run: Self::read_images },
        FieldStep { name: "structured_data", run: Self::read_structured_data },
        FieldStep { name: "price", run: Self::read_price },
    ];

    /// Create a parser with the default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ItemSelectors::default())
    }

    /// Create a parser with custom selector configuration
    pub fn with_config(selectors: &ItemSelectors) -> ParsingResult<Self> {
        Ok(Self {
            title: compile_selector("title", &selectors.title)?,
            impressions: compile_selector("impressions", &selectors.impressions)?,
            stat_items: compile_selector("stat_items", &selectors.stat_items)?,
            seller_name: compile_selector("seller_name", &selectors.seller_name)?,
            pro_badge: compile_selector("pro_badge", &selectors.pro_badge)?,
            phone_mask: compile_selector("phone_mask", &selectors.phone_mask)?,
            params_item: compile_selector("params_item", &selectors.params_item)?,
            params_label: compile_selector("params_label", &selectors.params_label)?,
            params_values: compile_selector("params_values", &selectors.params_values)?,
            description: compile_selector("description", &selectors.description)?,
            map_city: compile_selector("map_city", &selectors.map_city)?,
            date_widgets: compile_selector("date_widgets", &selectors.date_widgets)?,
            date_spans: compile_selector("date_spans", &selectors.date_spans)?,
            ad_id: compile_selector("ad_id", &selectors.ad_id)?,
            gallery_images: compile_selector("gallery_images", &selectors.gallery_images)?,
            price: compile_selector("price", &selectors.price)?,
            structured: StructuredDataExtractor::with_selector(&selectors.structured_data)?,
            city_pattern: Self::compile_city_pattern(&selectors.known_cities)?,
        })
    }

    fn compile_city_pattern(cities: &[String]) -> ParsingResult<Option<Regex>> {
        let names: Vec<String> = cities
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(regex::escape)
            .collect();
        if names.is_empty() {
            return Ok(None);
        }

        Regex::new(&format!("(?i)({})", names.join("|")))
            .map(Some)
            .map_err(|e| ParsingError::InvalidPattern {
                field: "known_cities".to_string(),
                reason: e.to_string(),
            })
    }

    /// Parse raw page content into a record for `context.link`.
    ///
    /// The document is parsed and dropped inside this call.
    pub fn parse_item(&self, body: &str, context: &DetailParseContext) -> ItemRecord {
        let html = Html::parse_document(body);
        match self.parse_with_context(&html, context) {
            Ok(record) => record,
            Err(e) => ItemRecord::failed(&context.link, e.to_string()),
        }
    }

    fn read_title(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        record.title = first_text(html, &self.title, "");
        Ok(())
    }

    fn read_statistics(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        if let Some(counter) = html.select(&self.impressions).next() {
            let text = counter.text().collect::<String>();
            if let Some(found) = IMPRESSIONS_RE.captures(&text).and_then(|c| c.get(1)) {
                let digits = digits_only(found.as_str());
                let shows = digits.parse::<u64>().map_err(|e| {
                    ParsingError::unexpected_markup("statistics", format!("impressions '{digits}': {e}"))
                })?;
                record.shows = Some(shows);
            }
        }

        let mut counters = html
            .select(&self.stat_items)
            .map(|item| parse_locale_number(&collapsed_text(item, " ")).map(|n| n.trunc() as u64));
        record.views = counters.next().flatten();
        record.favorites = counters.next().flatten();
        Ok(())
    }

    fn read_seller(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        record.seller_name = first_text(html, &self.seller_name, "");
        record.seller_is_pro = Some(html.select(&self.pro_badge).next().is_some());
        record.phone_mask = first_text(html, &self.phone_mask, "");
        Ok(())
    }

    fn read_params(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        let mut failure = None;

        for item in html.select(&self.params_item) {
            let Some(label) = item.select(&self.params_label).next() else {
                continue;
            };
            let label = collapsed_text(label, "");
            let Some(field) = match_label(&label) else {
                debug!("Ignoring unknown parameter '{}'", label);
                continue;
            };

            let values: Vec<String> = item
                .select(&self.params_values)
                .skip(1)
                .map(|value| collapsed_text(value, ""))
                .filter(|value| !value.is_empty())
                .collect();

            if let Err(e) = field.apply(record, &values) {
                failure.get_or_insert(e);
            }
        }

        failure.map_or(Ok(()), Err)
    }

    fn read_description(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        record.description = first_text(html, &self.description, " ");
        Ok(())
    }

    fn read_city(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        record.city = first_text(html, &self.map_city, "").or_else(|| {
            let pattern = self.city_pattern.as_ref()?;
            let title = record.title.as_deref()?;
            pattern.captures(title).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
        });
        Ok(())
    }

    fn read_dates(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        let widgets: Vec<ElementRef<'_>> = html.select(&self.date_widgets).collect();
        let stamp = |index: usize| {
            widgets
                .get(index)
                .and_then(|widget| widget.select(&self.date_spans).nth(1))
                .map(|span| collapsed_text(span, ""))
                .filter(|text| !text.is_empty())
        };

        record.created = stamp(0);
        record.updated = stamp(1);
        Ok(())
    }

    fn read_ad_id(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        record.ad_id = html.select(&self.ad_id).next().and_then(|element| {
            let text = element.text().collect::<String>();
            AD_ID_RE.captures(&text).map(|c| c[1].to_string())
        });
        Ok(())
    }

    fn read_images(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();

        for image in html.select(&self.gallery_images) {
            let Some(src) = image.value().attr("src").map(str::trim) else {
                continue;
            };
            let src = match src.strip_prefix("//") {
                Some(rest) => format!("https://{rest}"),
                None => src.to_string(),
            };
            if !(src.starts_with("http://") || src.starts_with("https://")) {
                continue;
            }
            if seen.insert(src.clone()) {
                images.push(src);
            }
        }

        record.images = images;
        Ok(())
    }

    fn read_structured_data(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        if let Some(offer) = self.structured.extract(html) {
            record.apply_structured(&offer);
        }
        Ok(())
    }

    /// Markup price first, unconditionally; structured-data values then win.
    fn read_price(&self, html: &Html, record: &mut ItemRecord) -> ParsingResult<()> {
        let dom = html
            .select(&self.price)
            .next()
            .map(|element| dom_price_from_text(&collapsed_text(element, " ")))
            .unwrap_or_default();
        record.resolve_price(dom);
        Ok(())
    }
}

/// Amount and currency read from a free-text price such as `"3 900 000 сом"`.
fn dom_price_from_text(text: &str) -> DomPrice {
    let lower = text.to_lowercase();
    let currency = if USD_MARKERS.iter().any(|m| lower.contains(m)) {
        Some("USD".to_string())
    } else if LOCAL_CURRENCY_MARKERS.iter().any(|m| lower.contains(m)) {
        Some("KGS".to_string())
    } else {
        None
    };

    DomPrice {
        amount: parse_locale_number(text),
        currency,
    }
}

impl ContextualParser for ItemDetailParser {
    type Output = ItemRecord;
    type Context = DetailParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!("Parsing item page: {}", context.link);
        let mut record = ItemRecord::for_link(&context.link);

        for step in Self::STEPS {
            if let Err(e) = (step.run)(self, html, &mut record) {
                if e.is_recoverable() {
                    warn!("Step '{}' failed for {}: {}", step.name, context.link, e);
                } else {
                    error!("Step '{}' cannot run for {}: {}", step.name, context.link, e);
                }
                record.note_error(format!("{}: {}", step.name, e));
            }
        }

        Ok(record)
    }
}
