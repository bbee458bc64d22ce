//! Domain module - records produced by a harvest run
//!
//! - `listing`: canonical links discovered while walking the listing feed
//! - `item_record`: the full attribute set extracted from one item page
//! - `mint_record`: the reduced, USD-normalized projection of an item

pub mod item_record;
pub mod listing;
pub mod mint_record;

pub use item_record::{DomPrice, ItemRecord, StructuredOffer};
pub use listing::ListingLink;
pub use mint_record::MintRecord;
