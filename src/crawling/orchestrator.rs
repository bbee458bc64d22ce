//! Harvest orchestrator
//!
//! Walks the listing feed, then extracts every discovered item strictly in
//! discovery order, one at a time. Exactly one record is produced per link.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use super::fetcher::PageFetcher;
use super::item_extractor::ItemExtractor;
use super::listing_walker::{ListingWalker, WalkStop};
use crate::domain::{ItemRecord, ListingLink};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::pacing::Pacer;
use crate::infrastructure::parsing::{ItemDetailParser, ListingPageParser, ParsingResult};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarvestError {
    #[error("No item links were found in the listing feed")]
    NoLinksDiscovered,
}

/// Run limits
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub max_pages: u32,
    pub max_items: usize,
    pub deep_scrape: bool,
    /// Emit a progress line every N items (and after the last one)
    pub progress_every: usize,
}

impl HarvestOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_pages: config.crawling.max_pages,
            max_items: config.crawling.max_items,
            deep_scrape: config.crawling.deep_scrape,
            progress_every: config.crawling.progress_every.max(1),
        }
    }
}

/// Records of one run plus how the link walk ended
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    pub records: Vec<ItemRecord>,
    pub pages_fetched: u32,
    pub walk_stop: WalkStop,
}

impl HarvestOutcome {
    pub fn failed_items(&self) -> usize {
        self.records.iter().filter(|r| r.has_error()).count()
    }
}

pub struct HarvestOrchestrator {
    walker: ListingWalker,
    extractor: ItemExtractor,
    item_pacer: Pacer,
    options: HarvestOptions,
}

impl HarvestOrchestrator {
    pub fn new(walker: ListingWalker, extractor: ItemExtractor, item_pacer: Pacer, options: HarvestOptions) -> Self {
        Self {
            walker,
            extractor,
            item_pacer,
            options,
        }
    }

    /// Wire parsers, pacing and limits from the application configuration.
    pub fn from_config(config: &AppConfig, fetcher: Arc<dyn PageFetcher>) -> ParsingResult<Self> {
        let walker = ListingWalker::new(
            fetcher.clone(),
            ListingPageParser::with_config(&config.parsing.listing)?,
            config.crawling.base_url.clone(),
            Pacer::from(config.crawling.page_delay),
        );
        let extractor = ItemExtractor::new(fetcher, ItemDetailParser::with_config(&config.parsing.item)?);

        Ok(Self::new(
            walker,
            extractor,
            Pacer::from(config.crawling.item_delay),
            HarvestOptions::from_config(config),
        ))
    }

    pub async fn run(&self) -> Result<HarvestOutcome, HarvestError> {
        let walk = self.walker.walk(self.options.max_pages, self.options.max_items).await;

        if walk.links.is_empty() {
            error!("No links found, nothing to extract ({:?})", walk.stop);
            return Err(HarvestError::NoLinksDiscovered);
        }

        let records = if self.options.deep_scrape {
            self.extract_all(&walk.links).await
        } else {
            info!("Item pages skipped (deep scrape disabled)");
            walk.links.iter().map(ItemRecord::for_link).collect()
        };

        Ok(HarvestOutcome {
            records,
            pages_fetched: walk.pages_fetched,
            walk_stop: walk.stop,
        })
    }

    async fn extract_all(&self, links: &[ListingLink]) -> Vec<ItemRecord> {
        let total = links.len();
        info!("Extracting {} items", total);

        let mut records = Vec::with_capacity(total);
        for (index, link) in links.iter().enumerate() {
            let position = index + 1;
            let record = self.extractor.extract_item_at(link, index).await;

            if let Some(reason) = &record.error {
                warn!("Item {}/{} failed: {} ({})", position, total, record.url, reason);
            }
            if position % self.options.progress_every == 0 || position == total {
                info!("Processed {}/{}", position, total);
            }

            records.push(record);
            if position < total {
                self.item_pacer.pause().await;
            }
        }

        info!("Item extraction finished");
        records
    }
}
