//! The normalized transaction model every import format produces.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Canonical transaction kinds shared by every import format.
///
/// `Ignore` marks rows the source format knows but the calculation does not
/// care about (cashback, deposits, ...); parsers drop them before the
/// transaction list leaves the importer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxKind {
    Buy,
    Sell,
    Dividend,
    Interest,
    Split,
    ReverseSplit,
    CustodyFee,
    Fee,
    Ignore,
}

/// Monetary fields exactly as the source format states them.
///
/// Trading 212 exports an aggregate gross amount plus a currency-conversion
/// fee; the other formats export a unit price plus a flat fee. Keeping the
/// two shapes as variants keeps format knowledge out of the ledger loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Money {
    /// Aggregate gross total and currency-conversion fee.
    Gross { total: Decimal, fx_fee: Decimal },
    /// Unit price and flat fee.
    Unit { price: Decimal, fee: Decimal },
}

impl Money {
    /// Total purchase price of a BUY, or gross proceeds of a SELL.
    pub fn gross_value(&self, qty: Decimal) -> Decimal {
        match self {
            Money::Gross { total, .. } => *total,
            Money::Unit { price, .. } => qty * *price,
        }
    }

    /// The fee attached to the row: conversion fee or flat commission.
    pub fn fee(&self) -> Decimal {
        match self {
            Money::Gross { fx_fee, .. } => *fx_fee,
            Money::Unit { fee, .. } => *fee,
        }
    }

    /// The amount of a DIVIDEND or INTEREST row.
    pub fn income_amount(&self) -> Decimal {
        match self {
            Money::Gross { total, .. } => *total,
            Money::Unit { price, .. } => *price,
        }
    }
}

/// One normalized transaction, ready for the ledger.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub time: NaiveDateTime,
    pub kind: TxKind,
    /// Uppercased ticker; `CASH` where the source leaves it blank.
    pub symbol: String,
    /// Display name from the source, when it has one.
    pub name: Option<String>,
    pub qty: Decimal,
    pub money: Money,
}
