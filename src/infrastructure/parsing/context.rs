//! Parsing context for listing and item pages

use url::Url;

use crate::domain::ListingLink;

/// Context for one listing page
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// 1-based page number in the feed
    pub page_number: u32,

    /// URL the page was fetched from, used to resolve relative links
    pub page_url: Url,
}

impl ParseContext {
    pub fn new(page_number: u32, page_url: Url) -> Self {
        Self {
            page_number,
            page_url,
        }
    }
}

/// Context for one item page
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    pub link: ListingLink,

    /// Position of the link in discovery order
    pub index: Option<usize>,
}

impl DetailParseContext {
    pub fn new(link: ListingLink) -> Self {
        Self { link, index: None }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}
