//! Crawling pipeline
//!
//! - `fetcher`: the page-fetch seam every network call goes through
//! - `listing_walker`: paginates the feed and collects item links
//! - `item_extractor`: turns one item page into a record
//! - `orchestrator`: runs the walk and the extraction end to end

pub mod fetcher;
pub mod item_extractor;
pub mod listing_walker;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod mock_fetcher;

pub use fetcher::{FetchError, FetchedPage, PageFetcher};
pub use item_extractor::ItemExtractor;
pub use listing_walker::{ListingWalk, ListingWalker, WalkStop};
pub use orchestrator::{HarvestError, HarvestOptions, HarvestOrchestrator, HarvestOutcome};
