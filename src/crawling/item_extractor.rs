//! Item extractor
//!
//! Fetches one item page and turns it into an [`ItemRecord`]. Nothing escapes
//! this boundary: transport failures and error statuses become a record whose
//! `error` is set and whose `url` is the canonical link.

use std::sync::Arc;

use tracing::debug;

use super::fetcher::PageFetcher;
use crate::domain::{ItemRecord, ListingLink};
use crate::infrastructure::parsing::{DetailParseContext, ItemDetailParser};

pub struct ItemExtractor {
    fetcher: Arc<dyn PageFetcher>,
    parser: ItemDetailParser,
}

impl ItemExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: ItemDetailParser) -> Self {
        Self { fetcher, parser }
    }

    pub async fn extract_item(&self, link: &ListingLink) -> ItemRecord {
        self.extract(DetailParseContext::new(link.clone())).await
    }

    /// Same as [`ItemExtractor::extract_item`], tagging logs with the discovery index.
    pub async fn extract_item_at(&self, link: &ListingLink, index: usize) -> ItemRecord {
        self.extract(DetailParseContext::new(link.clone()).with_index(index)).await
    }

    async fn extract(&self, context: DetailParseContext) -> ItemRecord {
        let link = &context.link;
        debug!("Fetching item {:?}: {}", context.index, link);

        match self.fetcher.fetch(link.as_str()).await {
            Ok(page) if page.is_error_status() => {
                ItemRecord::failed(link, format!("HTTP error {} for {}", page.status, link))
            }
            Ok(page) => self.parser.parse_item(&page.body, &context),
            Err(e) => ItemRecord::failed(link, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawling::mock_fetcher::{MockFetcher, item_page};

    const URL: &str = "https://lalafo.kg/bishkek/ads/flat-id-1";

    fn extractor(fetcher: MockFetcher) -> ItemExtractor {
        ItemExtractor::new(Arc::new(fetcher), ItemDetailParser::new().unwrap())
    }

    #[tokio::test]
    async fn test_structured_price_wins_end_to_end() {
        let fetcher = MockFetcher::new().with_page(
            URL,
            200,
            &item_page("2-комн. квартира", "3 900 000 сом", Some((45000.0, "USD"))),
        );

        let record = extractor(fetcher).extract_item(&ListingLink::new(URL)).await;

        assert_eq!(record.price, Some(45000.0));
        assert_eq!(record.currency.as_deref(), Some("USD"));
        assert_eq!(record.title.as_deref(), Some("2-комн. квартира"));
        assert_eq!(record.error, None);
    }

    #[tokio::test]
    async fn test_link_is_fetched_in_canonical_form() {
        let fetcher = Arc::new(MockFetcher::new().with_page(URL, 200, &item_page("Квартира", "", None)));
        let extractor = ItemExtractor::new(fetcher.clone(), ItemDetailParser::new().unwrap());

        let record = extractor
            .extract_item(&ListingLink::new(&format!("{URL}?utm_source=feed#gallery")))
            .await;

        assert_eq!(record.url, URL);
        assert_eq!(fetcher.calls(), vec![URL.to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_record() {
        let record = extractor(MockFetcher::new().with_failure(URL))
            .extract_item(&ListingLink::new(URL))
            .await;

        assert_eq!(record.url, URL);
        assert!(record.error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(record.title, None);
    }

    #[tokio::test]
    async fn test_error_status_becomes_error_record() {
        let record = extractor(MockFetcher::new().with_page(URL, 410, "gone"))
            .extract_item_at(&ListingLink::new(URL), 3)
            .await;

        assert_eq!(record.error.as_deref(), Some(format!("HTTP error 410 for {URL}").as_str()));
    }
}
