//! One calculation run: a broker export through the FIFO book, with income
//! totals, data-quality warnings, and the capital-tax estimate.

use crate::error::ImportError;
use crate::importers::{self, Format, RawTable, Transaction, TxKind};
use crate::tax::fifo::{qty_epsilon, FifoBook, SaleResult};
use crate::tax::rules::{estimate_capital_tax, resolve_rules_for_year, TaxRuleSet};
use anyhow::Result;
use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default)]
pub struct CalculationOptions {
    /// Fail on a SELL exceeding the held quantity instead of skipping the
    /// row with a warning.
    pub strict_sells: bool,
}

/// A dividend received during the tax year.
#[derive(Clone, Debug, Serialize)]
pub struct DividendRecord {
    pub date: NaiveDateTime,
    pub symbol: String,
    pub name: String,
    pub amount: Decimal,
}

/// Interest received during the tax year.
#[derive(Clone, Debug, Serialize)]
pub struct InterestRecord {
    pub date: NaiveDateTime,
    pub amount: Decimal,
}

/// Proceeds, cost-used and gain totals over one group of sales.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SaleTotals {
    pub proceeds: Decimal,
    pub cost: Decimal,
    pub gain: Decimal,
}

/// Everything one calculation run produces.
#[derive(Clone, Debug, Serialize)]
pub struct CalculationResult {
    pub year: i32,
    pub rule_year: i32,
    pub rules: TaxRuleSet,
    pub sales: Vec<SaleResult>,
    pub dividends: Vec<DividendRecord>,
    pub interests: Vec<InterestRecord>,
    pub warnings: Vec<String>,
    pub total_gains: Decimal,
    pub total_losses: Decimal,
    pub net_gains: Decimal,
    pub dividends_gross: Decimal,
    pub dividends_taxable: Decimal,
    pub interest_income: Decimal,
    pub custody_fees: Decimal,
    pub custody_deductible: Decimal,
    pub net_capital_income: Decimal,
    pub estimated_tax: Decimal,
    /// Roll-up over profitable sales, as entered in the filing.
    pub profitable: SaleTotals,
    /// Roll-up over loss-making sales.
    pub loss_making: SaleTotals,
}

/// Run a full calculation from raw CSV text.
///
/// The format is auto-detected from the header row; an explicitly requested
/// format is used only when detection fails, and overridden when detection
/// disagrees.
pub fn calculate(
    csv_text: &str,
    format: Option<Format>,
    year: i32,
    options: CalculationOptions,
) -> Result<CalculationResult> {
    let table = importers::parse_table(csv_text)?;
    let format = resolve_format(&table, format)?;
    let transactions = importers::parse_transactions(format, &table)?;
    info!(
        "parsed {} transactions from {format} format",
        transactions.len()
    );

    calculate_transactions(&transactions, year, options)
}

fn resolve_format(table: &RawTable, requested: Option<Format>) -> Result<Format, ImportError> {
    match (importers::detect_format(table), requested) {
        (Ok(detected), Some(requested)) => {
            if detected != requested {
                info!("auto-detected {detected} format, overriding requested {requested}");
            }
            Ok(detected)
        }
        (Ok(detected), None) => Ok(detected),
        (Err(err), Some(requested)) => {
            debug!("format auto-detection failed ({err}), using requested {requested}");
            Ok(requested)
        }
        (Err(err), None) => Err(err),
    }
}

/// Run a calculation over an already-normalized, date-sorted transaction
/// list.
pub fn calculate_transactions(
    transactions: &[Transaction],
    year: i32,
    options: CalculationOptions,
) -> Result<CalculationResult> {
    let (rule_year, rules) = resolve_rules_for_year(year)?;
    if rule_year != year {
        info!("no rule set for {year}, applying {rule_year} rules");
    }

    let mut book = FifoBook::new(rules);
    let mut sales: Vec<SaleResult> = Vec::new();
    let mut dividends = Vec::new();
    let mut interests = Vec::new();
    let mut warnings = Vec::new();
    let mut symbol_names: HashMap<String, String> = HashMap::new();

    let mut dividends_gross = Decimal::ZERO;
    let mut dividends_taxable = Decimal::ZERO;
    let mut interest_income = Decimal::ZERO;
    let mut custody_fees = Decimal::ZERO;

    for tx in transactions {
        if let Some(name) = tx.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            match symbol_names.get(&tx.symbol) {
                None => {
                    symbol_names.insert(tx.symbol.clone(), name.to_string());
                }
                Some(existing) if existing != name => {
                    warn!("{}: display name changed from {existing:?} to {name:?}", tx.symbol);
                    warnings.push(format!(
                        "{}: inconsistent display name \"{name}\" (keeping \"{existing}\")",
                        tx.symbol
                    ));
                }
                Some(_) => {}
            }
        }

        match tx.kind {
            TxKind::Buy => {
                book.buy(
                    &tx.symbol,
                    tx.time,
                    tx.qty,
                    tx.money.gross_value(tx.qty),
                    tx.money.fee(),
                )?;
            }

            TxKind::Sell => {
                if !options.strict_sells {
                    let held = book.held_quantity(&tx.symbol);
                    if held <= qty_epsilon() {
                        warnings.push(format!(
                            "{}: sell of {} {} before any buy, row skipped",
                            tx.time.date(),
                            tx.qty,
                            tx.symbol
                        ));
                        continue;
                    }
                    if held < tx.qty - qty_epsilon() {
                        warnings.push(format!(
                            "{}: sell of {} {} exceeds held quantity {}, row skipped",
                            tx.time.date(),
                            tx.qty,
                            tx.symbol,
                            held
                        ));
                        continue;
                    }
                }

                let name = symbol_names
                    .get(&tx.symbol)
                    .map(String::as_str)
                    .unwrap_or("");
                let sale = book.sell(
                    &tx.symbol,
                    name,
                    tx.time,
                    tx.qty,
                    tx.money.gross_value(tx.qty),
                    tx.money.fee(),
                )?;

                if tx.time.year() == year {
                    sales.push(sale);
                } else {
                    debug!(
                        "sale of {} on {} outside tax year {year}, not reported",
                        tx.symbol,
                        tx.time.date()
                    );
                }
            }

            TxKind::Split | TxKind::ReverseSplit => {
                book.apply_split(&tx.symbol, tx.qty)?;
            }

            TxKind::Dividend => {
                if tx.time.year() == year {
                    let amount = tx.money.income_amount();
                    dividends_gross += amount;
                    dividends_taxable += amount * rules.listed_dividend_taxable_share;
                    dividends.push(DividendRecord {
                        date: tx.time,
                        symbol: tx.symbol.clone(),
                        name: symbol_names.get(&tx.symbol).cloned().unwrap_or_default(),
                        amount,
                    });
                }
            }

            TxKind::Interest => {
                if tx.time.year() == year {
                    let amount = tx.money.income_amount();
                    interest_income += amount;
                    interests.push(InterestRecord {
                        date: tx.time,
                        amount,
                    });
                }
            }

            TxKind::CustodyFee | TxKind::Fee => {
                if tx.time.year() == year {
                    custody_fees += tx.money.fee();
                }
            }

            TxKind::Ignore => {}
        }
    }

    for warning in &warnings {
        warn!("{warning}");
    }

    let profitable = sale_totals(sales.iter().filter(|s| s.gain > Decimal::ZERO));
    let loss_making = sale_totals(sales.iter().filter(|s| s.gain < Decimal::ZERO));
    let total_gains = profitable.gain;
    let total_losses = loss_making.gain;
    let net_gains = total_gains + total_losses;

    let custody_deductible =
        (custody_fees - rules.custody_deductible_excess).max(Decimal::ZERO);
    let net_capital_income =
        net_gains + dividends_taxable + interest_income - custody_deductible;
    let estimated_tax = estimate_capital_tax(net_capital_income, rules);

    Ok(CalculationResult {
        year,
        rule_year,
        rules: rules.clone(),
        sales,
        dividends,
        interests,
        warnings,
        total_gains,
        total_losses,
        net_gains,
        dividends_gross,
        dividends_taxable,
        interest_income,
        custody_fees,
        custody_deductible,
        net_capital_income,
        estimated_tax,
        profitable,
        loss_making,
    })
}

fn sale_totals<'a>(sales: impl Iterator<Item = &'a SaleResult>) -> SaleTotals {
    let mut totals = SaleTotals::default();
    for sale in sales {
        totals.proceeds += sale.proceeds;
        totals.cost += sale.cost_used();
        totals.gain += sale.gain;
    }
    totals
}
