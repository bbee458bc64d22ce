use serde::Serialize;

use super::item_record::ItemRecord;
use crate::utils::{convert_to_usd, extract_first_integer, first_of};

/// Reduced, USD-normalized projection of an [`ItemRecord`].
///
/// Always regenerated from the full record; never edited on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MintRecord {
    pub id: String,
    pub address: String,
    pub square_meters: Option<f64>,
    pub rooms: Option<i64>,
    pub price_usd: Option<f64>,
    pub photo_url: Option<String>,
    /// Filled in by an external enrichment step
    pub legal_docs_url: String,
}

impl MintRecord {
    pub const COLUMNS: [&'static str; 7] = [
        "id",
        "address",
        "square_meters",
        "rooms",
        "price_usd",
        "photo_url",
        "legal_docs_url",
    ];

    /// Project one item; `fx_rate` is local currency units per USD.
    pub fn from_item(item: &ItemRecord, fx_rate: f64) -> Self {
        let price = item.price.or(item.jl_price);
        let currency = item
            .currency
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(item.jl_currency.as_deref());

        let address = [item.city.as_deref(), item.district.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: item.ad_id.clone().unwrap_or_default(),
            address,
            square_meters: item.area_m2,
            rooms: item.rooms.as_deref().and_then(extract_first_integer),
            price_usd: convert_to_usd(price, currency, fx_rate),
            photo_url: first_of(item.images_joined().as_deref()),
            legal_docs_url: String::new(),
        }
    }

    pub fn project_all(items: &[ItemRecord], fx_rate: f64) -> Vec<Self> {
        items.iter().map(|item| Self::from_item(item, fx_rate)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ListingLink;

    fn item() -> ItemRecord {
        let mut item = ItemRecord::for_link(&ListingLink::new("https://lalafo.kg/bishkek/ads/flat-7"));
        item.ad_id = Some("104233817".to_string());
        item.city = Some("Бишкек".to_string());
        item.district = Some("Джал".to_string());
        item.area_m2 = Some(42.0);
        item.rooms = Some("2 комнаты".to_string());
        item.price = Some(8700.0);
        item.currency = Some("KGS".to_string());
        item.images = vec!["https://img/a.jpg".into(), "https://img/b.jpg".into()];
        item
    }

    #[test]
    fn test_projection() {
        let mint = MintRecord::from_item(&item(), 87.0);

        assert_eq!(mint.id, "104233817");
        assert_eq!(mint.address, "Бишкек, Джал");
        assert_eq!(mint.square_meters, Some(42.0));
        assert_eq!(mint.rooms, Some(2));
        assert_eq!(mint.price_usd, Some(100.0));
        assert_eq!(mint.photo_url.as_deref(), Some("https://img/a.jpg"));
        assert!(mint.legal_docs_url.is_empty());
    }

    #[test]
    fn test_projection_falls_back_to_structured_price() {
        let mut item = item();
        item.price = None;
        item.currency = None;
        item.jl_price = Some(45000.0);
        item.jl_currency = Some("USD".to_string());
        item.district = None;

        let mint = MintRecord::from_item(&item, 87.0);
        assert_eq!(mint.price_usd, Some(45000.0));
        assert_eq!(mint.address, "Бишкек");
    }

    #[test]
    fn test_projection_of_failed_item() {
        let failed = ItemRecord::failed(&ListingLink::new("https://lalafo.kg/ads/x"), "timeout");
        let mint = MintRecord::from_item(&failed, 87.0);

        assert_eq!(mint.id, "");
        assert_eq!(mint.address, "");
        assert_eq!(mint.rooms, None);
        assert_eq!(mint.price_usd, None);
        assert_eq!(mint.photo_url, None);
    }

    #[test]
    fn test_field_order_matches_columns() {
        let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(vec![]);
        writer.serialize(MintRecord::from_item(&item(), 87.0)).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let header: Vec<String> = reader.headers().unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(header, MintRecord::COLUMNS.to_vec());
    }
}
