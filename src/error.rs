//! Error types for import, ledger, and tax-rule lookup failures.
//!
//! Library code returns these typed errors; the CLI boundary wraps them with
//! anyhow context. Parser errors are fail-fast: one bad row aborts the whole
//! import with the 1-based row number attached.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while turning a broker CSV export into transactions.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV file is empty")]
    EmptyFile,

    #[error("CSV read error")]
    Csv(#[from] csv::Error),

    #[error("missing columns in CSV: {}{}", .missing.join(", "), format_hint(.hint))]
    MissingColumns {
        missing: Vec<String>,
        /// Set when auto-detection says the file matches a different format.
        hint: Option<String>,
    },

    #[error("CSV format not recognized, found columns: {}", .found.join(", "))]
    UnknownFormat { found: Vec<String> },

    #[error("row {row}: {source}")]
    Row {
        /// 1-based row number counted from the header (first data row is 2).
        row: usize,
        #[source]
        source: RowError,
    },
}

impl ImportError {
    pub(crate) fn at_row(row: usize, source: RowError) -> Self {
        ImportError::Row { row, source }
    }
}

fn format_hint(hint: &Option<String>) -> String {
    match hint {
        Some(format) => format!(" (the file looks like the {format} format, select that instead)"),
        None => String::new(),
    }
}

/// Field-level failures inside a single CSV row.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("invalid date \"{0}\", expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    InvalidDate(String),

    #[error("field \"{field}\" is not a number (value: \"{value}\")")]
    InvalidNumber { field: String, value: String },

    #[error("field \"{0}\" is missing")]
    MissingField(&'static str),

    #[error("unknown type \"{0}\"")]
    UnknownType(String),

    #[error("only EUR is supported (found \"{0}\")")]
    UnsupportedCurrency(String),
}

/// Errors raised by the FIFO lot ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("BUY qty must be > 0 (got {0})")]
    NonPositiveBuy(Decimal),

    #[error("SELL qty must be > 0 (got {0})")]
    NonPositiveSell(Decimal),

    #[error("split ratio must be > 0 (got {0})")]
    NonPositiveRatio(Decimal),

    #[error("not enough lots to sell {qty} {symbol} on {date}: missing acquisition history")]
    InsufficientLots {
        symbol: String,
        qty: Decimal,
        date: NaiveDate,
    },
}

/// Errors raised by tax-rule lookup.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("no tax rule sets are configured")]
    NoRuleSets,
}
