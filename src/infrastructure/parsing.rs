//! HTML parsing infrastructure
//!
//! Trait-based parsers for listing pages and item pages, plus the structured-data
//! extractor shared by the item parser. Parsers compile their selectors once at
//! construction and are then reused for every page of a run.

pub mod config;
pub mod context;
pub mod item_detail_parser;
pub mod listing_page_parser;
pub mod param_rules;
pub mod structured_data;

pub use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};
pub use config::{ItemSelectors, ListingSelectors, ParsingConfig};
pub use context::{DetailParseContext, ParseContext};
pub use item_detail_parser::ItemDetailParser;
pub use listing_page_parser::ListingPageParser;
pub use param_rules::{ParamField, match_label};
pub use structured_data::StructuredDataExtractor;

use scraper::{ElementRef, Html, Selector};

/// Parser over an already-parsed document with per-page context
pub trait ContextualParser {
    type Output;
    type Context;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Compile one selector, naming the field it belongs to on failure.
pub(crate) fn compile_selector(field: &str, selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(field, selector, e))
}

/// Text of an element with each text node trimmed and empty nodes dropped,
/// joined by `separator`.
pub(crate) fn collapsed_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Collapsed text of the first match, if it is non-empty
pub(crate) fn first_text(html: &Html, selector: &Selector, separator: &str) -> Option<String> {
    html.select(selector)
        .next()
        .map(|e| collapsed_text(e, separator))
        .filter(|t| !t.is_empty())
}
