//! Listing walker
//!
//! Fetches listing pages one at a time in increasing order and collects item
//! links in discovery order, deduplicated for the run. The walk ends at the item
//! cap, at the first page with no new links, at the first failed fetch, or after
//! `max_pages` pages, whichever comes first. None of these is an error.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use super::fetcher::PageFetcher;
use crate::domain::ListingLink;
use crate::infrastructure::config::urls::listing_page_url;
use crate::infrastructure::pacing::Pacer;
use crate::infrastructure::parsing::{ListingPageParser, ParseContext};

/// Why the walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStop {
    /// The running link count reached `max_items`
    ItemCapReached,
    /// A page contributed no new links; the feed is exhausted
    EmptyPage { page: u32 },
    /// A page could not be fetched or came back with an error status
    FetchFailed { page: u32, reason: String },
    /// `max_pages` pages were fetched
    PageLimitReached,
}

/// Outcome of a listing walk
#[derive(Debug, Clone)]
pub struct ListingWalk {
    pub links: Vec<ListingLink>,
    pub pages_fetched: u32,
    pub stop: WalkStop,
}

pub struct ListingWalker {
    fetcher: Arc<dyn PageFetcher>,
    parser: ListingPageParser,
    base_url: String,
    pacer: Pacer,
}

impl ListingWalker {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: ListingPageParser, base_url: impl Into<String>, pacer: Pacer) -> Self {
        Self {
            fetcher,
            parser,
            base_url: base_url.into(),
            pacer,
        }
    }

    /// Links only; see [`ListingWalker::walk`] for the stop reason.
    pub async fn collect_links(&self, max_pages: u32, max_items: usize) -> Vec<ListingLink> {
        self.walk(max_pages, max_items).await.links
    }

    pub async fn walk(&self, max_pages: u32, max_items: usize) -> ListingWalk {
        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let mut pages_fetched = 0;

        if max_items == 0 {
            return ListingWalk {
                links,
                pages_fetched,
                stop: WalkStop::ItemCapReached,
            };
        }

        info!("Collecting links (max {} pages / {} items)", max_pages, max_items);

        for page in 1..=max_pages {
            if page > 1 {
                self.pacer.pause().await;
            }

            let url = listing_page_url(&self.base_url, page);
            pages_fetched += 1;

            let fetched = match self.fetcher.fetch(&url).await {
                Ok(fetched) if fetched.is_error_status() => {
                    warn!("Status {} on page {}, stopping link collection", fetched.status, page);
                    let reason = format!("HTTP status {}", fetched.status);
                    return finish(links, pages_fetched, WalkStop::FetchFailed { page, reason });
                }
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!("Network error on page {}: {}. Stopping link collection", page, e);
                    let reason = e.to_string();
                    return finish(links, pages_fetched, WalkStop::FetchFailed { page, reason });
                }
            };

            let page_url = match Url::parse(&fetched.url).or_else(|_| Url::parse(&url)) {
                Ok(page_url) => page_url,
                Err(e) => {
                    let reason = format!("invalid page URL '{url}': {e}");
                    return finish(links, pages_fetched, WalkStop::FetchFailed { page, reason });
                }
            };

            let candidates = self
                .parser
                .extract_links(&fetched.body, &ParseContext::new(page, page_url))
                .unwrap_or_else(|e| {
                    warn!("Could not parse page {}: {}", page, e);
                    Vec::new()
                });

            let mut found = 0;
            for link in candidates {
                if !seen.insert(link.clone()) {
                    continue;
                }
                links.push(link);
                found += 1;
                if links.len() >= max_items {
                    info!("Reached the item limit of {}", max_items);
                    return finish(links, pages_fetched, WalkStop::ItemCapReached);
                }
            }

            info!("Page {:02}: found {} new links (total {})", page, found, links.len());

            if found == 0 {
                info!("No new links on page {}, stopping link collection", page);
                return finish(links, pages_fetched, WalkStop::EmptyPage { page });
            }
        }

        finish(links, pages_fetched, WalkStop::PageLimitReached)
    }
}

fn finish(links: Vec<ListingLink>, pages_fetched: u32, stop: WalkStop) -> ListingWalk {
    info!("Link collection finished: {} links from {} pages", links.len(), pages_fetched);
    ListingWalk {
        links,
        pages_fetched,
        stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawling::mock_fetcher::{MockFetcher, listing_page};

    const BASE: &str = "https://lalafo.kg/kyrgyzstan/kvartiry/prodazha-kvartir";

    fn page(n: u32) -> String {
        listing_page_url(BASE, n)
    }

    fn walker(fetcher: &Arc<MockFetcher>) -> ListingWalker {
        ListingWalker::new(fetcher.clone(), ListingPageParser::new().unwrap(), BASE, Pacer::none())
    }

    #[tokio::test]
    async fn test_stops_after_page_without_new_links() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(&page(1), 200, &listing_page(&["/bishkek/ads/a-1", "/bishkek/ads/a-2", "/osh/ads/a-3"]))
                .with_page(&page(2), 200, &listing_page(&[])),
        );

        let walk = walker(&fetcher).walk(150, 5000).await;

        assert_eq!(walk.links.len(), 3);
        assert_eq!(walk.pages_fetched, 2);
        assert_eq!(walk.stop, WalkStop::EmptyPage { page: 2 });
        assert_eq!(fetcher.calls(), vec![page(1), page(2)]);
    }

    #[tokio::test]
    async fn test_repeated_links_count_as_empty_page() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(&page(1), 200, &listing_page(&["/bishkek/ads/a-1", "/bishkek/ads/a-2"]))
                .with_page(&page(2), 200, &listing_page(&["/bishkek/ads/a-2?utm=x", "/bishkek/ads/a-1#top"])),
        );

        let walk = walker(&fetcher).walk(150, 5000).await;

        let urls: Vec<&str> = walk.links.iter().map(ListingLink::as_str).collect();
        assert_eq!(urls, vec!["https://lalafo.kg/bishkek/ads/a-1", "https://lalafo.kg/bishkek/ads/a-2"]);
        assert_eq!(walk.stop, WalkStop::EmptyPage { page: 2 });
    }

    #[tokio::test]
    async fn test_item_cap_truncates_exactly() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(&page(1), 200, &listing_page(&["/ads/1", "/ads/2", "/ads/3"]))
                .with_page(&page(2), 200, &listing_page(&["/ads/4", "/ads/5", "/ads/6"])),
        );

        let walk = walker(&fetcher).walk(150, 4).await;

        let urls: Vec<&str> = walk.links.iter().map(ListingLink::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://lalafo.kg/ads/1",
                "https://lalafo.kg/ads/2",
                "https://lalafo.kg/ads/3",
                "https://lalafo.kg/ads/4",
            ]
        );
        assert_eq!(walk.stop, WalkStop::ItemCapReached);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_item_cap_fetches_nothing() {
        let fetcher = Arc::new(MockFetcher::new());
        let walk = walker(&fetcher).walk(150, 0).await;

        assert!(walk.links.is_empty());
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_page_limit_bounds_the_walk() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(&page(1), 200, &listing_page(&["/ads/1"]))
                .with_page(&page(2), 200, &listing_page(&["/ads/2"]))
                .with_page(&page(3), 200, &listing_page(&["/ads/3"])),
        );

        let walk = walker(&fetcher).walk(2, 5000).await;

        assert_eq!(walk.links.len(), 2);
        assert_eq!(walk.stop, WalkStop::PageLimitReached);
        assert_eq!(fetcher.calls(), vec![page(1), page(2)]);
    }

    #[tokio::test]
    async fn test_transport_failure_returns_partial_links() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(&page(1), 200, &listing_page(&["/ads/1", "/ads/2"]))
                .with_failure(&page(2)),
        );

        let walk = walker(&fetcher).walk(150, 5000).await;

        assert_eq!(walk.links.len(), 2);
        assert!(matches!(walk.stop, WalkStop::FetchFailed { page: 2, .. }));
    }

    #[tokio::test]
    async fn test_error_status_stops_the_walk() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page(&page(1), 200, &listing_page(&["/ads/1"]))
                .with_page(&page(2), 503, "maintenance"),
        );

        let links = walker(&fetcher).collect_links(150, 5000).await;

        assert_eq!(links.len(), 1);
        assert_eq!(fetcher.calls().len(), 2);
    }
}
