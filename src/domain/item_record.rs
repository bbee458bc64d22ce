use serde::{Serialize, Serializer};

use super::listing::ListingLink;

/// Offer description read from an embedded structured-data block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredOffer {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub date_posted: Option<String>,
    pub location: Option<String>,
}

/// Best-effort price scraped from the page markup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomPrice {
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

/// Full attribute set for one listing.
///
/// Field order is the column order of the full dataset. When `error` is set, every
/// field other than `url` is partial and must not be relied upon.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemRecord {
    pub url: String,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub city: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub ad_id: Option<String>,

    pub shows: Option<u64>,
    pub views: Option<u64>,
    pub favorites: Option<u64>,
    pub seller_name: Option<String>,
    pub seller_is_pro: Option<bool>,
    pub phone_mask: Option<String>,

    pub rooms: Option<String>,
    pub area_m2: Option<f64>,
    pub floor: Option<u32>,
    pub floors_total: Option<u32>,
    pub district: Option<String>,
    pub series: Option<String>,
    pub documents: Option<String>,
    pub heating: Option<String>,
    pub repair: Option<String>,
    pub features: Option<String>,
    pub offer_type: Option<String>,
    pub deal_type: Option<String>,

    pub description: Option<String>,
    #[serde(serialize_with = "serialize_image_list")]
    pub images: Vec<String>,

    pub jl_title: Option<String>,
    pub jl_price: Option<f64>,
    pub jl_currency: Option<String>,
    pub jl_date: Option<String>,
    pub jl_location: Option<String>,

    pub error: Option<String>,
}

impl ItemRecord {
    /// Column order of the full dataset
    pub const COLUMNS: [&'static str; 34] = [
        "url",
        "title",
        "price",
        "currency",
        "city",
        "created",
        "updated",
        "ad_id",
        "shows",
        "views",
        "favorites",
        "seller_name",
        "seller_is_pro",
        "phone_mask",
        "rooms",
        "area_m2",
        "floor",
        "floors_total",
        "district",
        "series",
        "documents",
        "heating",
        "repair",
        "features",
        "offer_type",
        "deal_type",
        "description",
        "images",
        "jl_title",
        "jl_price",
        "jl_currency",
        "jl_date",
        "jl_location",
        "error",
    ];

    /// Empty record carrying only the listing URL
    pub fn for_link(link: &ListingLink) -> Self {
        Self {
            url: link.as_str().to_string(),
            ..Self::default()
        }
    }

    /// Record for an item whose page could not be obtained at all
    pub fn failed(link: &ListingLink, error: impl Into<String>) -> Self {
        let mut record = Self::for_link(link);
        record.error = Some(error.into());
        record
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Append a failure note; several notes are joined with `"; "`.
    pub fn note_error(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        match &mut self.error {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(message);
            }
            None => self.error = Some(message.to_string()),
        }
    }

    /// Copy a structured-data offer into the `jl_*` shadow fields.
    pub fn apply_structured(&mut self, offer: &StructuredOffer) {
        self.jl_title.clone_from(&offer.title);
        self.jl_price = offer.price;
        self.jl_currency.clone_from(&offer.currency);
        self.jl_date.clone_from(&offer.date_posted);
        self.jl_location.clone_from(&offer.location);
    }

    /// Resolve `price`/`currency`.
    ///
    /// The markup price is always written first; structured-data values then overwrite
    /// it wherever they are present.
    pub fn resolve_price(&mut self, dom: DomPrice) {
        self.price = dom.amount;
        self.currency = dom.currency;

        if let Some(price) = self.jl_price {
            self.price = Some(price);
        }
        if let Some(currency) = self.jl_currency.as_ref().filter(|c| !c.trim().is_empty()) {
            self.currency = Some(currency.clone());
        }
    }

    /// Images as the `", "`-joined cell used by the tabular output
    pub fn images_joined(&self) -> Option<String> {
        if self.images.is_empty() {
            None
        } else {
            Some(self.images.join(", "))
        }
    }
}

fn serialize_image_list<S>(images: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if images.is_empty() {
        serializer.serialize_none()
    } else {
        serializer.serialize_str(&images.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ItemRecord {
        ItemRecord::for_link(&ListingLink::new("https://lalafo.kg/bishkek/ads/flat-1"))
    }

    fn som_dom_price() -> DomPrice {
        DomPrice {
            amount: Some(3_900_000.0),
            currency: Some("KGS".to_string()),
        }
    }

    #[test]
    fn test_structured_price_overrides_dom_price() {
        let mut r = record();
        r.apply_structured(&StructuredOffer {
            price: Some(45000.0),
            currency: Some("USD".to_string()),
            ..StructuredOffer::default()
        });
        r.resolve_price(som_dom_price());

        assert_eq!(r.price, Some(45000.0));
        assert_eq!(r.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_dom_price_used_without_structured_data() {
        let mut r = record();
        r.resolve_price(som_dom_price());

        assert_eq!(r.price, Some(3_900_000.0));
        assert_eq!(r.currency.as_deref(), Some("KGS"));
    }

    #[test]
    fn test_structured_price_without_currency_keeps_dom_currency() {
        let mut r = record();
        r.apply_structured(&StructuredOffer {
            price: Some(45000.0),
            ..StructuredOffer::default()
        });
        r.resolve_price(som_dom_price());

        assert_eq!(r.price, Some(45000.0));
        assert_eq!(r.currency.as_deref(), Some("KGS"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let offer = StructuredOffer {
            price: Some(45000.0),
            currency: Some("USD".to_string()),
            ..StructuredOffer::default()
        };
        let mut first = record();
        first.apply_structured(&offer);
        first.resolve_price(som_dom_price());

        let mut second = first.clone();
        second.resolve_price(som_dom_price());

        assert_eq!(first, second);
    }

    #[test]
    fn test_note_error_accumulates() {
        let mut r = record();
        assert!(!r.has_error());
        r.note_error("statistics: bad counter");
        r.note_error("params: bad floor");
        assert_eq!(
            r.error.as_deref(),
            Some("statistics: bad counter; params: bad floor")
        );
    }

    /// Header row `csv` derives from the struct's field order
    fn derived_header(record: &ItemRecord) -> Vec<String> {
        let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(vec![]);
        writer.serialize(record).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        reader.headers().unwrap().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_field_order_matches_columns() {
        let header = derived_header(&record());
        assert_eq!(header, ItemRecord::COLUMNS.to_vec());
    }

    #[test]
    fn test_images_serialize_as_joined_cell() {
        let mut r = record();
        r.images = vec!["https://img/1.jpg".into(), "https://img/2.jpg".into()];
        let value = serde_json::to_value(&r).unwrap();

        assert_eq!(value["images"], "https://img/1.jpg, https://img/2.jpg");
        assert!(value["title"].is_null());
    }
}
