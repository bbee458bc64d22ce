//! Listing page parser
//!
//! Pulls candidate item links out of one page of the search-results feed.
//! Deduplication across pages is the walker's job; this parser returns every
//! qualifying link on the page in document order.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::config::ListingSelectors;
use super::{ContextualParser, ParseContext, ParsingError, ParsingResult, compile_selector};
use crate::domain::ListingLink;

/// Parser for extracting item links from listing pages
pub struct ListingPageParser {
    item_link_selector: Selector,
    item_path_markers: Vec<String>,
}

impl ListingPageParser {
    /// Create a parser with the default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ListingSelectors::default())
    }

    pub fn with_config(selectors: &ListingSelectors) -> ParsingResult<Self> {
        Ok(Self {
            item_link_selector: compile_selector("item_link", &selectors.item_link)?,
            item_path_markers: selectors.item_path_markers.clone(),
        })
    }

    /// Parse raw page content; the document never outlives this call.
    pub fn extract_links(&self, body: &str, context: &ParseContext) -> ParsingResult<Vec<ListingLink>> {
        let html = Html::parse_document(body);
        self.parse_with_context(&html, context)
    }

    fn is_item_path(&self, href: &str) -> bool {
        self.item_path_markers.iter().any(|marker| href.contains(marker.as_str()))
    }

    fn resolve_url(href: &str, base: &Url) -> ParsingResult<ListingLink> {
        let resolved = base.join(href).map_err(|e| ParsingError::UrlResolutionFailed {
            url: href.to_string(),
            reason: e.to_string(),
            base_url: Some(base.to_string()),
        })?;
        Ok(ListingLink::new(resolved.as_str()))
    }
}

impl ContextualParser for ListingPageParser {
    type Output = Vec<ListingLink>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let mut links = Vec::new();

        for anchor in html.select(&self.item_link_selector) {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() || !self.is_item_path(href) {
                continue;
            }
            match Self::resolve_url(href, &context.page_url) {
                Ok(link) => links.push(link),
                Err(e) => debug!("Skipping link on page {}: {}", context.page_number, e),
            }
        }

        debug!("Found {} candidate links on page {}", links.len(), context.page_number);
        Ok(links)
    }
}
