//! Formatting helpers shared by tables and exports.
//!
//! Display output follows Finnish conventions: thousands separated by a
//! space, decimal comma, euro sign after the amount. Export files use plain
//! dot-decimal numbers so spreadsheet imports stay unambiguous.

use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;

/// `1234.5` → `1 234,50 €`
pub fn format_eur(value: Decimal) -> String {
    format!("{} €", format_number_fi(value))
}

/// `1234.5` → `1 234,50`
pub fn format_number_fi(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded < Decimal::ZERO;
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped},{frac_part}")
}

/// Two-decimal dot-separated number for CSV exports.
pub fn format_number_csv(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Quantity display without grouping or trailing zeros: `1.0` → `1`,
/// `0.60` → `0.6`.
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

/// `d.m.yyyy` without leading zeros, the fi-FI short date.
pub fn format_date_fi(time: NaiveDateTime) -> String {
    let date = time.date();
    format!("{}.{}.{}", date.day(), date.month(), date.year())
}

/// `Nokia Oyj (NOKIA)`, or just the symbol when the name is missing or
/// repeats it.
pub fn instrument_display(symbol: &str, name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case(symbol) {
        symbol.to_string()
    } else {
        format!("{name} ({symbol})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn formats_currency_finnish_style() {
        assert_eq!(format_eur(dec!(1234.5)), "1 234,50 €");
        assert_eq!(format_eur(dec!(-1234567.891)), "-1 234 567,89 €");
        assert_eq!(format_eur(Decimal::ZERO), "0,00 €");
        assert_eq!(format_eur(dec!(999)), "999,00 €");
    }

    #[test]
    fn csv_numbers_use_dot_decimals() {
        assert_eq!(format_number_csv(dec!(1234.5)), "1234.50");
        assert_eq!(format_number_csv(dec!(-0.125)), "-0.12");
    }

    #[test]
    fn quantities_drop_trailing_zeros() {
        assert_eq!(format_quantity(dec!(1.0)), "1");
        assert_eq!(format_quantity(dec!(0.60)), "0.6");
        assert_eq!(format_quantity(dec!(2.5)), "2.5");
    }

    #[test]
    fn dates_format_without_leading_zeros() {
        let time = NaiveDate::from_ymd_opt(2025, 1, 5)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(format_date_fi(time), "5.1.2025");
    }

    #[test]
    fn instrument_display_combines_name_and_symbol() {
        assert_eq!(instrument_display("AAPL", "Apple Inc"), "Apple Inc (AAPL)");
        assert_eq!(instrument_display("AAPL", ""), "AAPL");
        assert_eq!(instrument_display("AAPL", "aapl"), "AAPL");
    }
}
