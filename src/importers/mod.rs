// Import module - broker CSV normalizers and format auto-detection

mod ibkr;
mod manual;
mod raw_csv;
mod revolut;
mod trading212;
mod transaction;

pub use raw_csv::{detect_delimiter, parse_table, RawTable};
pub use transaction::{Money, Transaction, TxKind};

use crate::error::{ImportError, RowError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Supported broker export formats, in auto-detection preference order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Trading212,
    Manual,
    Revolut,
    Ibkr,
}

impl Format {
    pub const ALL: [Format; 4] = [
        Format::Trading212,
        Format::Manual,
        Format::Revolut,
        Format::Ibkr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Trading212 => "trading212",
            Format::Manual => "manual",
            Format::Revolut => "revolut",
            Format::Ibkr => "ibkr",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Format::Trading212 => "Trading 212 history export",
            Format::Manual => "generic manual CSV",
            Format::Revolut => "Revolut trading statement",
            Format::Ibkr => "Interactive Brokers trade export",
        }
    }

    /// Column names that must all be present (case-insensitive) in the
    /// header row for this format.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Format::Trading212 => trading212::REQUIRED_COLUMNS,
            Format::Manual => manual::REQUIRED_COLUMNS,
            Format::Revolut => revolut::REQUIRED_COLUMNS,
            Format::Ibkr => ibkr::REQUIRED_COLUMNS,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trading212" | "t212" => Ok(Format::Trading212),
            "manual" => Ok(Format::Manual),
            "revolut" => Ok(Format::Revolut),
            "ibkr" | "interactivebrokers" => Ok(Format::Ibkr),
            other => Err(format!("unknown import format: {other}")),
        }
    }
}

/// Detect the format from the header set.
///
/// The first format in preference order whose required columns are all
/// present wins; extra columns are ignored.
pub fn detect_format(table: &RawTable) -> Result<Format, ImportError> {
    if table.is_empty() {
        return Err(ImportError::EmptyFile);
    }

    for format in Format::ALL {
        if table.missing_columns(format.required_columns()).is_empty() {
            return Ok(format);
        }
    }

    Err(ImportError::UnknownFormat {
        found: table.headers().to_vec(),
    })
}

/// Parse a table with an explicitly chosen format.
///
/// The returned transaction list is sorted ascending by timestamp.
pub fn parse_transactions(
    format: Format,
    table: &RawTable,
) -> Result<Vec<Transaction>, ImportError> {
    if table.is_empty() {
        return Err(ImportError::EmptyFile);
    }

    match format {
        Format::Trading212 => trading212::parse(table),
        Format::Manual => manual::parse(table),
        Format::Revolut => revolut::parse(table),
        Format::Ibkr => ibkr::parse(table),
    }
}

/// Validate required columns, cross-checking auto-detection so the error can
/// hint at the format the file actually matches.
fn ensure_columns(table: &RawTable, format: Format) -> Result<(), ImportError> {
    let missing = table.missing_columns(format.required_columns());
    if missing.is_empty() {
        return Ok(());
    }

    let hint = detect_format(table)
        .ok()
        .filter(|detected| *detected != format)
        .map(|detected| detected.name().to_string());

    Err(ImportError::MissingColumns { missing, hint })
}

fn field<'a>(row: &'a HashMap<String, String>, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or("")
}

/// Strip surrounding quote characters the way spreadsheet round-trips leave
/// them: `'Foo'`, `"Foo"` and `` `Foo` `` all become `Foo`.
fn sanitize_quoted(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim()
        .to_string()
}

/// Display name from the optional columns some exports carry.
fn display_name(row: &HashMap<String, String>) -> Option<String> {
    ["name", "instrument", "company"]
        .iter()
        .map(|key| sanitize_quoted(field(row, key)))
        .find(|name| !name.is_empty())
}

/// Parse a numeric field, tolerating a comma decimal separator. Empty fields
/// read as zero, matching how broker exports leave irrelevant cells blank.
fn parse_decimal(raw: &str, field_name: &str) -> Result<Decimal, RowError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }

    Decimal::from_str(&trimmed.replace(',', ".")).map_err(|_| RowError::InvalidNumber {
        field: field_name.to_string(),
        value: trimmed.to_string(),
    })
}

/// `YYYY-MM-DD`, optionally followed by ` HH:MM[:SS]` (or a `T` separator).
/// Round-trips through calendar construction, so day 30 of February fails.
fn parse_datetime(raw: &str) -> Result<NaiveDateTime, RowError> {
    let value = raw.trim();
    let invalid = || RowError::InvalidDate(value.to_string());

    if !has_date_shape(value) {
        return Err(invalid());
    }

    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(time) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(time);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| invalid())
}

/// Zero-padded `YYYY-MM-DD` prefix; chrono alone would accept `2025-1-5`.
fn has_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
        && (bytes.len() == 10 || bytes[10] == b' ' || bytes[10] == b'T')
}
