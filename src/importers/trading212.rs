//! Trading 212 history export parser.
//!
//! Monetary columns carry aggregate amounts (gross total plus currency
//! conversion fee) rather than unit prices, and the action column encodes
//! the row type in free text ("Market buy", "Dividend (Ordinary)", ...).

use super::{
    display_name, ensure_columns, field, parse_datetime, parse_decimal, sanitize_quoted, Format,
    Money, RawTable, Transaction, TxKind,
};
use crate::error::{ImportError, RowError};
use std::collections::HashMap;
use tracing::debug;

pub(crate) const REQUIRED_COLUMNS: &[&str] = &[
    "action",
    "time",
    "ticker",
    "no. of shares",
    "gross total",
    "currency (gross total)",
    "currency conversion fee",
];

pub(crate) fn parse(table: &RawTable) -> Result<Vec<Transaction>, ImportError> {
    ensure_columns(table, Format::Trading212)?;

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
    let action = field(row, "action").trim().to_lowercase();
    let time_raw = field(row, "time").trim();

    if action.is_empty() {
        return Err(RowError::MissingField("action"));
    }
    if time_raw.is_empty() {
        return Err(RowError::MissingField("time"));
    }

    let ticker = sanitize_quoted(field(row, "ticker")).to_uppercase();
    let name = display_name(row);
    let qty = parse_decimal(field(row, "no. of shares"), "no. of shares")?;
    let gross_total = parse_decimal(field(row, "gross total"), "gross total")?;
    let fx_fee = parse_decimal(
        field(row, "currency conversion fee"),
        "currency conversion fee",
    )?;
    let time = parse_datetime(time_raw)?;

    let kind = map_action(&action);
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
        qty,
        money: Money::Gross {
            total: gross_total.abs(),
            fx_fee: fx_fee.abs(),
        },
    }))
}

fn map_action(action: &str) -> TxKind {
    if action.contains("market buy") || action.contains("limit buy") || has_word(action, "buy") {
        TxKind::Buy
    } else if action.contains("market sell")
        || action.contains("limit sell")
        || has_word(action, "sell")
    {
        TxKind::Sell
    } else if action.contains("interest on cash") {
        TxKind::Interest
    } else if action.contains("dividend") {
        TxKind::Dividend
    } else {
        TxKind::Ignore
    }
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| w == word)
}

#[cfg(test)]
mod tests {
    use super::super::{parse_table, parse_transactions};
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str =
        "Action,Time,Ticker,No. of shares,Gross Total,Currency (Gross Total),Currency conversion fee\n";

    fn parse_text(body: &str) -> Result<Vec<Transaction>, ImportError> {
        let table = parse_table(&format!("{HEADER}{body}")).unwrap();
        parse_transactions(Format::Trading212, &table)
    }

    #[test]
    fn maps_actions_to_kinds() {
        let txs = parse_text(
            "Market buy,2025-01-15 10:30:00,AAPL,10,1500.00,EUR,0.50\n\
             Market sell,2025-06-10 14:22:00,AAPL,5,800.00,EUR,0.25\n\
             \"Dividend (Ordinary)\",2025-03-20 00:00:00,AAPL,0,25.00,EUR,0.00\n\
             Interest on cash,2025-04-01 00:00:00,,0,1.23,EUR,0.00\n\
             Deposit,2025-01-02 00:00:00,,0,1000.00,EUR,0.00\n",
        )
        .unwrap();

        let kinds: Vec<TxKind> = txs.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TxKind::Buy, TxKind::Dividend, TxKind::Interest, TxKind::Sell]
        );
    }

    #[test]
    fn output_is_sorted_by_time() {
        let txs = parse_text(
            "Market sell,2025-06-10 14:22:00,AAPL,5,800.00,EUR,0\n\
             Market buy,2025-01-15 10:30:00,AAPL,10,1500.00,EUR,0\n",
        )
        .unwrap();
        assert_eq!(txs[0].kind, TxKind::Buy);
        assert_eq!(txs[1].kind, TxKind::Sell);
    }

    #[test]
    fn gross_amounts_are_absolute_values() {
        let txs = parse_text("Market sell,2025-06-10 14:22:00,AAPL,5,-800.00,EUR,-0.25\n").unwrap();
        assert_eq!(
            txs[0].money,
            Money::Gross {
                total: dec!(800.00),
                fx_fee: dec!(0.25),
            }
        );
    }

    #[test]
    fn blank_ticker_becomes_cash() {
        let txs = parse_text("Interest on cash,2025-04-01 00:00:00,,0,1.23,EUR,0\n").unwrap();
        assert_eq!(txs[0].symbol, "CASH");
    }

    #[test]
    fn bad_number_carries_row_number() {
        let err = parse_text(
            "Market buy,2025-01-15 10:30:00,AAPL,10,1500.00,EUR,0\n\
             Market buy,2025-01-16 10:30:00,AAPL,ten,1500.00,EUR,0\n",
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("row 3:"), "got: {err}");
    }

    #[test]
    fn bad_date_carries_row_number() {
        let err = parse_text("Market buy,2025-02-30 10:30:00,AAPL,10,1500.00,EUR,0\n").unwrap_err();
        assert!(err.to_string().starts_with("row 2:"), "got: {err}");
        assert!(err.to_string().contains("2025-02-30"));
    }

    #[test]
    fn missing_columns_hint_at_manual_format() {
        let table =
            parse_table("date,type,symbol,qty,price_eur,fee_eur\n2025-01-15,BUY,AAPL,10,150,5\n")
                .unwrap();
        let err = parse_transactions(Format::Trading212, &table).unwrap_err();
        match err {
            ImportError::MissingColumns { ref hint, .. } => {
                assert_eq!(hint.as_deref(), Some("manual"));
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}
