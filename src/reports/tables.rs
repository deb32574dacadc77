//! Terminal rendering of calculation results.

use crate::reports::audit::ReportRow;
use crate::tax::calculation::CalculationResult;
use crate::tax::fifo::CostMethod;
use crate::utils::{format_date_fi, format_eur, format_quantity, instrument_display};
use colored::Colorize;
use itertools::Itertools;
use rust_decimal::Decimal;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct SaleRowDisplay {
    #[tabled(rename = "Instrument")]
    instrument: String,
    #[tabled(rename = "Qty")]
    qty: String,
    #[tabled(rename = "Acquired")]
    acquired: String,
    #[tabled(rename = "Sold")]
    sold: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Acq. price")]
    acquisition_price: String,
    #[tabled(rename = "Acq. fees")]
    acquisition_fees: String,
    #[tabled(rename = "Sell fees")]
    sell_fees: String,
    #[tabled(rename = "Deemed cost")]
    deemed_cost: String,
    #[tabled(rename = "Gain")]
    gain: String,
}

/// Deemed cost is shown only for sales that actually used it.
fn deemed_cost_display(row: &ReportRow) -> String {
    match row.method {
        CostMethod::Deemed => format_eur(row.deemed_cost),
        CostMethod::Actual => "-".to_string(),
    }
}

pub fn render_sales_table(rows: &[ReportRow]) -> String {
    let display: Vec<SaleRowDisplay> = rows
        .iter()
        .map(|row| SaleRowDisplay {
            instrument: instrument_display(&row.symbol, &row.name),
            qty: format_quantity(row.qty),
            acquired: format_date_fi(row.acquired),
            sold: format_date_fi(row.sold),
            proceeds: format_eur(row.proceeds),
            acquisition_price: format_eur(row.acquisition_price),
            acquisition_fees: format_eur(row.acquisition_fees),
            sell_fees: format_eur(row.sell_fees),
            deemed_cost: deemed_cost_display(row),
            gain: format_eur(row.gain),
        })
        .collect();

    Table::new(display).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct AuditRowDisplay {
    #[tabled(rename = "Sold")]
    sold: String,
    #[tabled(rename = "Instrument")]
    instrument: String,
    #[tabled(rename = "Acquired")]
    acquired: String,
    #[tabled(rename = "Used from lot")]
    used: String,
    #[tabled(rename = "Lot original")]
    original: String,
    #[tabled(rename = "Lot left")]
    left: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Gain piece")]
    gain: String,
}

pub fn render_audit_table(rows: &[ReportRow]) -> String {
    let display: Vec<AuditRowDisplay> = rows
        .iter()
        .map(|row| AuditRowDisplay {
            sold: format_date_fi(row.sold),
            instrument: instrument_display(&row.symbol, &row.name),
            acquired: format_date_fi(row.acquired),
            used: format_quantity(row.qty),
            original: format_quantity(row.lot_original_qty),
            left: format_quantity(row.lot_qty_after),
            method: row.method.to_string(),
            gain: format_eur(row.gain),
        })
        .collect();

    Table::new(display).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct DividendRowDisplay {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Instrument")]
    instrument: String,
    #[tabled(rename = "Gross dividend")]
    amount: String,
}

pub fn render_dividends_table(result: &CalculationResult) -> String {
    let display: Vec<DividendRowDisplay> = result
        .dividends
        .iter()
        .map(|row| DividendRowDisplay {
            date: format_date_fi(row.date),
            instrument: instrument_display(&row.symbol, &row.name),
            amount: format_eur(row.amount),
        })
        .collect();

    Table::new(display).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct InterestRowDisplay {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

pub fn render_interests_table(result: &CalculationResult) -> String {
    let display: Vec<InterestRowDisplay> = result
        .interests
        .iter()
        .map(|row| InterestRowDisplay {
            date: format_date_fi(row.date),
            amount: format_eur(row.amount),
        })
        .collect();

    Table::new(display).with(Style::rounded()).to_string()
}

fn signed_eur(value: Decimal) -> String {
    let text = format_eur(value);
    if value > Decimal::ZERO {
        text.green().to_string()
    } else if value < Decimal::ZERO {
        text.red().to_string()
    } else {
        text
    }
}

pub fn render_summary(result: &CalculationResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", "Capital gains".bold()));
    out.push_str(&format!("  Total gains:        {}\n", signed_eur(result.total_gains)));
    out.push_str(&format!("  Total losses:       {}\n", signed_eur(result.total_losses)));
    out.push_str(&format!("  Net:                {}\n", signed_eur(result.net_gains)));
    out.push('\n');

    out.push_str(&format!("{}\n", "Income".bold()));
    out.push_str(&format!("  Dividends (gross):  {}\n", format_eur(result.dividends_gross)));
    out.push_str(&format!("  Dividends taxable:  {}\n", format_eur(result.dividends_taxable)));
    out.push_str(&format!("  Interest:           {}\n", format_eur(result.interest_income)));
    out.push_str(&format!("  Custody fees:       {}\n", format_eur(result.custody_fees)));
    out.push_str(&format!("  Deductible part:    {}\n", format_eur(result.custody_deductible)));
    out.push('\n');

    out.push_str(&format!("{}\n", "Filing roll-up".bold()));
    out.push_str(&format!(
        "  Profitable sales:   proceeds {}, cost {}, gain {}\n",
        format_eur(result.profitable.proceeds),
        format_eur(result.profitable.cost),
        signed_eur(result.profitable.gain)
    ));
    out.push_str(&format!(
        "  Loss-making sales:  proceeds {}, cost {}, gain {}\n",
        format_eur(result.loss_making.proceeds),
        format_eur(result.loss_making.cost),
        signed_eur(result.loss_making.gain)
    ));
    out.push('\n');

    out.push_str(&format!(
        "  Net capital income: {}\n",
        signed_eur(result.net_capital_income)
    ));
    out.push_str(&format!(
        "  {} {}\n",
        "Estimated tax:".bold(),
        format_eur(result.estimated_tax)
    ));

    out
}

pub fn render_rules(result: &CalculationResult) -> String {
    let rules = &result.rules;
    let percent = |rate: Decimal| format!("{} %", format_quantity(rate * Decimal::ONE_HUNDRED));

    [
        format!("Tax year:               {}", result.year),
        format!("Rule year applied:      {}", result.rule_year),
        format!(
            "Capital tax:            {} / {} (bracket {})",
            percent(rules.capital_tax_low),
            percent(rules.capital_tax_high),
            format_eur(rules.capital_income_bracket_eur)
        ),
        format!(
            "Dividend taxable share: {}",
            percent(rules.listed_dividend_taxable_share)
        ),
        format!(
            "Deemed cost:            {} / {} (10y+)",
            percent(rules.deemed_cost_under_10y),
            percent(rules.deemed_cost_10y_or_more)
        ),
        format!(
            "Custody fee excess:     {}",
            format_eur(rules.custody_deductible_excess)
        ),
    ]
    .iter()
    .join("\n")
}

pub fn render_warnings(warnings: &[String]) -> String {
    warnings
        .iter()
        .map(|w| format!("{} {w}", "!".yellow().bold()))
        .join("\n")
}
