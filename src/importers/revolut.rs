//! Revolut trading statement parser.
//!
//! Unit-price format with a currency column; only EUR statements are
//! accepted since the calculation has no exchange-rate source.

use super::{
    display_name, ensure_columns, field, parse_datetime, parse_decimal, sanitize_quoted, Format,
    Money, RawTable, Transaction, TxKind,
};
use crate::error::{ImportError, RowError};
use std::collections::HashMap;
use tracing::debug;

pub(crate) const REQUIRED_COLUMNS: &[&str] =
    &["date", "type", "ticker", "quantity", "price", "fee", "currency"];

pub(crate) fn parse(table: &RawTable) -> Result<Vec<Transaction>, ImportError> {
    ensure_columns(table, Format::Revolut)?;

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
    if date_raw.is_empty() {
        return Err(RowError::MissingField("date"));
    }

    let kind = map_type(field(row, "type"));
    let ticker = sanitize_quoted(field(row, "ticker")).to_uppercase();
    let name = display_name(row);
    let qty = parse_decimal(field(row, "quantity"), "quantity")?;
    let price = parse_decimal(field(row, "price"), "price")?;
    let fee = parse_decimal(field(row, "fee"), "fee")?;

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
        symbol: if ticker.is_empty() {
            "CASH".to_string()
        } else {
            ticker
        },
        name,
        qty: qty.abs(),
        money: Money::Unit {
            price: price.abs(),
            fee: fee.abs(),
        },
    }))
}

fn map_type(raw: &str) -> TxKind {
    let value = raw.trim().to_lowercase();
    match value.as_str() {
        "buy" | "market buy" | "stock buy" => TxKind::Buy,
        "sell" | "market sell" | "stock sell" => TxKind::Sell,
        _ if value.contains("dividend") => TxKind::Dividend,
        _ if value.contains("interest") => TxKind::Interest,
        _ => TxKind::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_table, parse_transactions};
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "Date,Type,Ticker,Quantity,Price,Fee,Currency\n";

    fn parse_text(body: &str) -> Result<Vec<Transaction>, ImportError> {
        let table = parse_table(&format!("{HEADER}{body}")).unwrap();
        parse_transactions(Format::Revolut, &table)
    }

    #[test]
    fn maps_tolerant_type_strings() {
        let txs = parse_text(
            "2025-01-15,STOCK BUY,AAPL,10,150.00,1.00,EUR\n\
             2025-03-20,Dividend payment,AAPL,0,25.00,0,EUR\n\
             2025-04-01,Interest earned,,0,1.23,0,EUR\n\
             2025-06-10,market sell,AAPL,5,160.00,1.00,EUR\n\
             2025-07-01,TOP-UP,,0,500.00,0,EUR\n",
        )
        .unwrap();

        let kinds: Vec<TxKind> = txs.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TxKind::Buy, TxKind::Dividend, TxKind::Interest, TxKind::Sell]
        );
    }

    #[test]
    fn non_eur_currency_is_rejected() {
        let err = parse_text("2025-01-15,BUY,AAPL,10,150.00,1.00,USD\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("row 2:"), "got: {msg}");
        assert!(msg.contains("USD"));
    }

    #[test]
    fn blank_currency_is_accepted() {
        let txs = parse_text("2025-01-15,BUY,AAPL,10,150.00,1.00,\n").unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[test]
    fn values_are_absolute() {
        let txs = parse_text("2025-06-10,SELL,AAPL,-5,160.00,-1.00,EUR\n").unwrap();
        assert_eq!(txs[0].qty, dec!(5));
        assert_eq!(txs[0].money.fee(), dec!(1.00));
    }
}
