use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

/// Parse a pt-BR currency cell ("R$ 1.234,56") into an exact decimal.
///
/// Blank cells mean zero, not a fault; listings render absent values as
/// empty strings. Anything else unparseable is `None` and becomes a row
/// fault at the caller.
pub fn parse_currency(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }
    let normalized = cleaned.replace('.', "").replace(',', ".");
    normalized.parse().ok()
}

/// Parse a `dd/mm/yyyy` date cell. Blank or malformed cells are `None`;
/// date columns are genuinely optional in both portals.
pub fn parse_date_br(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d/%m/%Y").ok()
}

/// All decimal digits of `text`, in order.
pub fn digits_only(text: &str) -> String {
    static DIGIT: OnceLock<Regex> = OnceLock::new();
    let re = DIGIT.get_or_init(|| Regex::new(r"\d").expect("static regex"));
    re.find_iter(text).map(|m| m.as_str()).collect()
}

/// Derive the planning-document reference from a row description.
///
/// The portals embed the reference as the leading digits of the description:
/// seven digits meaning NNN/NNNN (document number / year). Shorter digit
/// runs pass through as-is. The lone 157/2024 entry is a known data-entry
/// error in the source system and is corrected to its actual year.
pub fn derive_document_ref(description: &str) -> String {
    let digits = digits_only(description);
    let derived = if digits.len() >= 7 {
        format!("{}/{}", &digits[..3], &digits[3..7])
    } else {
        digits
    };
    if derived == "157/2024" {
        "157/2025".to_string()
    } else {
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_with_symbol_and_separators() {
        assert_eq!(
            parse_currency("R$ 1.234,56"),
            Some(Decimal::new(123456, 2))
        );
    }

    #[test]
    fn currency_without_symbol() {
        assert_eq!(parse_currency("12.345.678,90"), Some(Decimal::new(1234567890, 2)));
    }

    #[test]
    fn blank_currency_is_zero() {
        assert_eq!(parse_currency(""), Some(Decimal::ZERO));
        assert_eq!(parse_currency("   "), Some(Decimal::ZERO));
    }

    #[test]
    fn garbage_currency_is_none() {
        assert_eq!(parse_currency("a definir"), None);
    }

    #[test]
    fn date_round_trips_br_format() {
        assert_eq!(
            parse_date_br("05/03/2025"),
            NaiveDate::from_ymd_opt(2025, 3, 5)
        );
    }

    #[test]
    fn blank_and_malformed_dates_are_none() {
        assert_eq!(parse_date_br(""), None);
        assert_eq!(parse_date_br("2025-03-05"), None);
        assert_eq!(parse_date_br("31/02/2025"), None);
    }

    #[test]
    fn document_ref_from_seven_digits() {
        assert_eq!(derive_document_ref("1572025 - Aquisição de material"), "157/2025");
        assert_eq!(derive_document_ref("DFD nº 0042025: serviços"), "004/2025");
    }

    #[test]
    fn short_digit_runs_pass_through() {
        assert_eq!(derive_document_ref("Processo 157"), "157");
        assert_eq!(derive_document_ref("sem número"), "");
    }

    #[test]
    fn known_mislabeled_year_is_corrected() {
        assert_eq!(derive_document_ref("1572024 - Aquisição"), "157/2025");
    }
}
