//! In-memory page fetcher for pipeline tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::fetcher::{FetchError, FetchedPage, PageFetcher};

enum Canned {
    Page { status: u16, body: String },
    Failure,
}

/// Serves canned pages and records every requested URL in order.
/// Unknown URLs come back as 404.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, Canned>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Canned::Page {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Canned::Failure);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        match self.pages.get(url) {
            Some(Canned::Page { status, body }) => Ok(FetchedPage {
                url: url.to_string(),
                status: *status,
                body: body.clone(),
            }),
            Some(Canned::Failure) => Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection reset by peer".to_string(),
            }),
            None => Ok(FetchedPage {
                url: url.to_string(),
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// Listing page markup with one item card per href
pub fn listing_page(hrefs: &[&str]) -> String {
    let cards: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<article class="ad-tile-horizontal"><a class="ad-tile-horizontal-link" href="{href}">card</a></article>"#
            )
        })
        .collect();
    format!("<html><body><div class=\"feed\">{cards}</div></body></html>")
}

/// Item page markup with a title, a markup price and optionally a structured-data price
pub fn item_page(title: &str, dom_price: &str, structured: Option<(f64, &str)>) -> String {
    let script = structured
        .map(|(price, currency)| {
            format!(
                r#"<script type="application/ld+json">{{"@type": "Offer", "price": {price}, "priceCurrency": "{currency}"}}</script>"#
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><head>{script}</head><body>
             <h1 class="ad-detail-title">{title}</h1>
             <div class="ad-detail-price">{dom_price}</div>
           </body></html>"#
    )
}
