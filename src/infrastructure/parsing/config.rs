//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors for the listing feed and item pages. Selector groups
//! (comma separated) act as fallbacks for markup variants.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub listing: ListingSelectors,
    pub item: ItemSelectors,
}

/// Selectors for listing (search result) pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// Anchor inside an item card
    pub item_link: String,

    /// Path fragments that identify an item page
    pub item_path_markers: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item_link: "article.ad-tile-horizontal a.ad-tile-horizontal-link[href]".to_string(),
            item_path_markers: vec!["/item/".to_string(), "/ads/".to_string(), "/ad/".to_string()],
        }
    }
}

/// Selectors for item detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSelectors {
    pub title: String,

    /// Statistics widget: impressions counter and the views/favorites list
    pub impressions: String,
    pub stat_items: String,

    pub seller_name: String,
    pub pro_badge: String,
    pub phone_mask: String,

    /// Labeled parameter list; the label is the first `params_label` inside an item
    pub params_item: String,
    pub params_label: String,
    pub params_values: String,

    pub description: String,
    pub map_city: String,

    /// Created/updated widgets, each a pair of spans
    pub date_widgets: String,
    pub date_spans: String,

    pub ad_id: String,
    pub gallery_images: String,
    pub price: String,

    /// Structured-data script blocks
    pub structured_data: String,

    /// Cities searched for in the title when the map caption is missing
    pub known_cities: Vec<String>,
}

impl Default for ItemSelectors {
    fn default() -> Self {
        Self {
            title: "h1.ad-detail-title, h1[class*='ad-detail-title']".to_string(),
            impressions: ".details-page__statistic-bar .impressions span".to_string(),
            stat_items: ".details-page__statistic-bar ul li".to_string(),
            seller_name: ".userName-text".to_string(),
            pro_badge: ".userName .pro-label, .userName-text + .pro-label, .pro-label".to_string(),
            phone_mask: ".phone-wrap p".to_string(),
            params_item: "ul.details-page__params > li".to_string(),
            params_label: "p".to_string(),
            params_values: "a, p".to_string(),
            description: ".description .description__wrap".to_string(),
            map_city: ".map-with-city-marker p.LFParagraph".to_string(),
            date_widgets: ".about-ad-info__date".to_string(),
            date_spans: "span".to_string(),
            ad_id: ".about-ad-info__id span".to_string(),
            gallery_images: ".slider-component__item img[src]".to_string(),
            price: "[class*=\"price\"], .price, .ad-detail-price".to_string(),
            structured_data: "script[type=\"application/ld+json\"]".to_string(),
            known_cities: [
                "Бишкек",
                "Ош",
                "Каракол",
                "Нарын",
                "Талас",
                "Баткен",
                "Джалал-Абад",
                "Маевка",
                "Кемин",
                "Тамчы",
                "Новониколаевка",
            ]
            .into_iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}
