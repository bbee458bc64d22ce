//! Text coercion helpers shared by the listing and item parsers
//!
//! Everything here is pure: locale-tolerant number parsing, URL canonicalization
//! and currency arithmetic. None of these functions fail loudly; unusable input
//! comes back as `None`.

use once_cell::sync::Lazy;
use regex::Regex;

static FIRST_INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Strip the query string and fragment from a URL, leaving scheme, host and path as-is.
///
/// Works on the raw string so that malformed URLs are still canonicalized the same way
/// every time; the operation is idempotent.
pub fn canonicalize_url(url: &str) -> String {
    match url.find(|c| c == '?' || c == '#') {
        Some(cut) => url[..cut].to_string(),
        None => url.to_string(),
    }
}

/// Parse a number written with spaces, non-breaking spaces, thousands separators
/// and/or a decimal comma, e.g. `"1 234,56"` or `"3 900 000 сом"`.
pub fn parse_locale_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// First contiguous run of ASCII digits in free text, e.g. `"2 комнаты"` -> `2`.
///
/// A run too long to fit in an `i64` yields `None`.
pub fn extract_first_integer(text: &str) -> Option<i64> {
    FIRST_INTEGER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// First element of a comma-delimited list, trimmed.
pub fn first_of(list: Option<&str>) -> Option<String> {
    list.and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Keep only ASCII digits, e.g. `"1 204"` -> `"1204"`.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// How a currency code relates to the USD normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyKind {
    Usd,
    /// Kyrgyz som, in any of its spellings
    Local,
    Other,
}

/// Spellings of the local currency accepted by [`CurrencyKind::classify`] (upper-cased).
pub const LOCAL_CURRENCY_CODES: &[&str] = &["KGS", "SOM", "СОМ"];

impl CurrencyKind {
    pub fn classify(code: Option<&str>) -> Self {
        let Some(code) = code else {
            return Self::Other;
        };
        let upper = code.trim().to_uppercase();
        if upper == "USD" {
            Self::Usd
        } else if LOCAL_CURRENCY_CODES.contains(&upper.as_str()) {
            Self::Local
        } else {
            Self::Other
        }
    }
}

/// Normalize an amount to USD.
///
/// Local-currency amounts are divided by `fx_rate` (local units per USD) and rounded to
/// cents. USD amounts pass through. Any other or missing currency code also passes
/// through unchanged and is treated as already being USD.
pub fn convert_to_usd(amount: Option<f64>, currency: Option<&str>, fx_rate: f64) -> Option<f64> {
    let amount = amount?;
    match CurrencyKind::classify(currency) {
        CurrencyKind::Local => Some(round_cents(amount / fx_rate)),
        CurrencyKind::Usd | CurrencyKind::Other => Some(amount),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://lalafo.kg/bishkek/ads/flat-123?utm=1#photos", "https://lalafo.kg/bishkek/ads/flat-123")]
    #[case("https://lalafo.kg/bishkek/ads/flat-123#top", "https://lalafo.kg/bishkek/ads/flat-123")]
    #[case("https://lalafo.kg/bishkek/ads/flat-123", "https://lalafo.kg/bishkek/ads/flat-123")]
    #[case("HTTPS://Lalafo.KG/Path", "HTTPS://Lalafo.KG/Path")]
    fn test_canonicalize_url(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(canonicalize_url(input), expected);
    }

    proptest! {
        #[test]
        fn canonicalize_url_is_idempotent(url in ".*") {
            let once = canonicalize_url(&url);
            prop_assert_eq!(canonicalize_url(&once), once);
        }
    }

    #[rstest]
    #[case("1 234,56", Some(1234.56))]
    #[case("1\u{00A0}234,56", Some(1234.56))]
    #[case("3 900 000 сом", Some(3_900_000.0))]
    #[case("$ 45000", Some(45000.0))]
    #[case("42,5 м²", Some(42.5))]
    #[case("", None)]
    #[case("abc", None)]
    #[case("1.234.5", None)]
    fn test_parse_locale_number(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_locale_number(input), expected);
    }

    #[test]
    fn test_extract_first_integer() {
        assert_eq!(extract_first_integer("2 комнаты"), Some(2));
        assert_eq!(extract_first_integer("Студия"), None);
        assert_eq!(extract_first_integer("этаж 7 из 10"), Some(7));
        assert_eq!(extract_first_integer("код 99999999999999999999"), None);
    }

    #[test]
    fn test_first_of() {
        assert_eq!(
            first_of(Some(" https://img/1.jpg , https://img/2.jpg")),
            Some("https://img/1.jpg".to_string())
        );
        assert_eq!(first_of(Some("")), None);
        assert_eq!(first_of(None), None);
    }

    #[rstest]
    #[case(Some(8700.0), Some("KGS"), Some(100.0))]
    #[case(Some(8700.0), Some("сом"), Some(100.0))]
    #[case(Some(8700.0), Some("som"), Some(100.0))]
    #[case(Some(100.0), Some("USD"), Some(100.0))]
    #[case(Some(100.0), Some("usd"), Some(100.0))]
    #[case(Some(50.0), None, Some(50.0))]
    #[case(Some(50.0), Some("EUR"), Some(50.0))]
    #[case(None, Some("KGS"), None)]
    fn test_convert_to_usd(
        #[case] amount: Option<f64>,
        #[case] currency: Option<&str>,
        #[case] expected: Option<f64>,
    ) {
        assert_eq!(convert_to_usd(amount, currency, 87.0), expected);
    }

    #[test]
    fn test_convert_to_usd_rounds_to_cents() {
        assert_eq!(convert_to_usd(Some(1000.0), Some("KGS"), 87.0), Some(11.49));
    }
}
