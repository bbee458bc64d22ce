//! Label rules for the item parameter list
//!
//! Rules are evaluated top to bottom against the lower-cased label and the first
//! match wins. Labels that match nothing are ignored.

use super::{ParsingError, ParsingResult};
use crate::domain::ItemRecord;
use crate::utils::{digits_only, parse_locale_number};

/// Record field a parameter label maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    Rooms,
    AreaM2,
    Floor,
    FloorsTotal,
    District,
    Series,
    Documents,
    Heating,
    Repair,
    Features,
    OfferType,
    DealType,
}

/// Label matcher: every fragment must occur in the label
#[derive(Debug, Clone, Copy)]
pub struct ParamRule {
    pub fragments: &'static [&'static str],
    pub field: ParamField,
}

impl ParamRule {
    fn matches(&self, label: &str) -> bool {
        self.fragments.iter().all(|fragment| label.contains(fragment))
    }
}

pub const PARAM_RULES: &[ParamRule] = &[
    ParamRule { fragments: &["количество комнат"], field: ParamField::Rooms },
    ParamRule { fragments: &["площадь", "м2"], field: ParamField::AreaM2 },
    ParamRule { fragments: &["этаж:"], field: ParamField::Floor },
    ParamRule { fragments: &["этажей в доме"], field: ParamField::FloorsTotal },
    ParamRule { fragments: &["район"], field: ParamField::District },
    ParamRule { fragments: &["серия"], field: ParamField::Series },
    ParamRule { fragments: &["правоустанавливающие"], field: ParamField::Documents },
    ParamRule { fragments: &["отопление"], field: ParamField::Heating },
    ParamRule { fragments: &["ремонт"], field: ParamField::Repair },
    ParamRule { fragments: &["дополнительно"], field: ParamField::Features },
    ParamRule { fragments: &["тип предложения"], field: ParamField::OfferType },
    ParamRule { fragments: &["тип сделки"], field: ParamField::DealType },
];

/// Field for a parameter label, or `None` for labels we do not know.
pub fn match_label(label: &str) -> Option<ParamField> {
    let label = label.trim().to_lowercase();
    PARAM_RULES
        .iter()
        .find(|rule| rule.matches(&label))
        .map(|rule| rule.field)
}

impl ParamField {
    /// Write the parameter values into the record.
    ///
    /// `values` are the trimmed, non-empty value texts in document order.
    pub fn apply(self, record: &mut ItemRecord, values: &[String]) -> ParsingResult<()> {
        let joined = Some(values.join("; ")).filter(|v| !v.is_empty());
        let first = values.first().map(String::as_str);

        match self {
            Self::Rooms => record.rooms = joined,
            Self::AreaM2 => record.area_m2 = first.and_then(parse_locale_number),
            Self::Floor => record.floor = parse_storey(first)?,
            Self::FloorsTotal => record.floors_total = parse_storey(first)?,
            Self::District => record.district = joined,
            Self::Series => record.series = joined,
            Self::Documents => record.documents = joined,
            Self::Heating => record.heating = joined,
            Self::Repair => record.repair = joined,
            Self::Features => record.features = joined,
            Self::OfferType => record.offer_type = joined,
            Self::DealType => record.deal_type = joined,
        }
        Ok(())
    }
}

/// Digits of a floor value; missing digits or `0` mean no value.
fn parse_storey(value: Option<&str>) -> ParsingResult<Option<u32>> {
    let digits = digits_only(value.unwrap_or_default());
    if digits.is_empty() {
        return Ok(None);
    }
    let storey = digits
        .parse::<u32>()
        .map_err(|e| ParsingError::unexpected_markup("params", format!("floor '{digits}': {e}")))?;
    Ok(Some(storey).filter(|n| *n > 0))
}
