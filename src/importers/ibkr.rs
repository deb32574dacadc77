//! Interactive Brokers trade export parser.
//!
//! Unit-price format; the action column is an exact BUY/SELL/DIVIDEND/
//! INTEREST tag and the display name comes from the optional description
//! column. Only EUR-denominated exports are accepted.

use super::{
    ensure_columns, field, parse_datetime, parse_decimal, sanitize_quoted, Format, Money, RawTable,
    Transaction, TxKind,
};
use crate::error::{ImportError, RowError};
use std::collections::HashMap;
use tracing::debug;

pub(crate) const REQUIRED_COLUMNS: &[&str] = &[
    "trade date",
    "action",
    "symbol",
    "quantity",
    "price",
    "commission",
    "currency",
];

pub(crate) fn parse(table: &RawTable) -> Result<Vec<Transaction>, ImportError> {
    ensure_columns(table, Format::Ibkr)?;

    let mut transactions = Vec::new();
    for (index, row) in table.rows().iter().enumerate() {
        let row_number = index + 2;
        if let Some(tx) = parse_row(row).map_err(|e| ImportError::at_row(row_number, e))? {
            transactions.push(tx);
        } else {
            debug!("row {row_number}: action not relevant for taxes, ignored");
        }
    }

    transactions.sort_by_key(|tx| tx.time);
    Ok(transactions)
}

fn parse_row(row: &HashMap<String, String>) -> Result<Option<Transaction>, RowError> {
    let date_raw = field(row, "trade date").trim();
    if date_raw.is_empty() {
        return Err(RowError::MissingField("trade date"));
    }

    let kind = map_action(field(row, "action"));
    let symbol = sanitize_quoted(field(row, "symbol")).to_uppercase();
    let name = ["description", "symbol name"]
        .iter()
        .map(|key| sanitize_quoted(field(row, key)))
        .find(|value| !value.is_empty());
    let qty = parse_decimal(field(row, "quantity"), "quantity")?;
    let price = parse_decimal(field(row, "price"), "price")?;
    let commission = parse_decimal(field(row, "commission"), "commission")?;

    let currency = field(row, "currency").trim().to_uppercase();
    if !currency.is_empty() && currency != "EUR" {
        return Err(RowError::UnsupportedCurrency(currency));
    }

    let time = parse_datetime(date_raw)?;
    if kind == TxKind::Ignore {
        return Ok(None);
    }

    Ok(Some(Transaction {
        time,
        kind,
        symbol: if symbol.is_empty() {
            "CASH".to_string()
        } else {
            symbol
        },
        name,
        qty: qty.abs(),
        money: Money::Unit {
            price: price.abs(),
            fee: commission.abs(),
        },
    }))
}

fn map_action(raw: &str) -> TxKind {
    match raw.trim().to_uppercase().as_str() {
        "BUY" => TxKind::Buy,
        "SELL" => TxKind::Sell,
        "DIVIDEND" => TxKind::Dividend,
        "INTEREST" => TxKind::Interest,
        _ => TxKind::Ignore,
    }
}
