//! Generic manual CSV parser.
//!
//! The richest format: besides trades and income it carries splits, custody
//! fees and generic fees. SPLIT and REVERSE_SPLIT rows put the ratio in the
//! qty column; DIVIDEND and INTEREST rows put the amount in price_eur.

use super::{
    display_name, ensure_columns, field, parse_datetime, parse_decimal, sanitize_quoted, Format,
    Money, RawTable, Transaction, TxKind,
};
use crate::error::{ImportError, RowError};
use std::collections::HashMap;
use tracing::debug;

pub(crate) const REQUIRED_COLUMNS: &[&str] =
    &["date", "type", "symbol", "qty", "price_eur", "fee_eur"];

pub(crate) fn parse(table: &RawTable) -> Result<Vec<Transaction>, ImportError> {
    ensure_columns(table, Format::Manual)?;

    let mut transactions = Vec::new();
    for (index, row) in table.rows().iter().enumerate() {
        let row_number = index + 2;
        if let Some(tx) = parse_row(row).map_err(|e| ImportError::at_row(row_number, e))? {
            transactions.push(tx);
        } else {
            debug!("row {row_number}: type not relevant for taxes, ignored");
        }
    }

    transactions.sort_by_key(|tx| tx.time);
    Ok(transactions)
}

fn parse_row(row: &HashMap<String, String>) -> Result<Option<Transaction>, RowError> {
    let date_raw = field(row, "date").trim();
    let type_raw = field(row, "type").trim().to_uppercase();
    let symbol = sanitize_quoted(field(row, "symbol")).to_uppercase();

    if date_raw.is_empty() {
        return Err(RowError::MissingField("date"));
    }
    if type_raw.is_empty() {
        return Err(RowError::MissingField("type"));
    }
    let kind = map_type(&type_raw)?;
    if symbol.is_empty() {
        return Err(RowError::MissingField("symbol"));
    }

    let name = display_name(row);
    let qty = parse_decimal(field(row, "qty"), "qty")?;
    let price = parse_decimal(field(row, "price_eur"), "price_eur")?;
    let fee = parse_decimal(field(row, "fee_eur"), "fee_eur")?;
    let time = parse_datetime(date_raw)?;

    if kind == TxKind::Ignore {
        return Ok(None);
    }

    Ok(Some(Transaction {
        time,
        kind,
        symbol,
        name,
        qty,
        money: Money::Unit { price, fee },
    }))
}

fn map_type(raw: &str) -> Result<TxKind, RowError> {
    match raw {
        "BUY" => Ok(TxKind::Buy),
        "SELL" => Ok(TxKind::Sell),
        "DIVIDEND" => Ok(TxKind::Dividend),
        "INTEREST" => Ok(TxKind::Interest),
        "SPLIT" => Ok(TxKind::Split),
        "REVERSE_SPLIT" => Ok(TxKind::ReverseSplit),
        "CUSTODY_FEE" => Ok(TxKind::CustodyFee),
        "FEE" => Ok(TxKind::Fee),
        "CASHBACK" => Ok(TxKind::Ignore),
        other => Err(RowError::UnknownType(other.to_string())),
    }
}
