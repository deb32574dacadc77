//! Expansion of aggregate sale results into per-lot report rows.
//!
//! Every downstream table and export consumes these rows: one row per
//! consumed lot, with proceeds, fees and deemed cost allocated by quantity
//! weight and the gain recomputed from the allocated pieces so the rows
//! reconcile with the aggregate sale.

use crate::tax::fifo::{qty_epsilon, CostMethod, SaleResult};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

/// One lot-allocation slice of an aggregate sale.
#[derive(Clone, Debug, Serialize)]
pub struct ReportRow {
    pub symbol: String,
    pub name: String,
    pub qty: Decimal,
    pub acquired: NaiveDateTime,
    pub sold: NaiveDateTime,
    pub proceeds: Decimal,
    pub acquisition_price: Decimal,
    pub acquisition_fees: Decimal,
    pub sell_fees: Decimal,
    pub deemed_cost: Decimal,
    pub method: CostMethod,
    pub gain: Decimal,
    pub lot_original_qty: Decimal,
    pub lot_qty_before: Decimal,
    pub lot_qty_after: Decimal,
}

/// Expand sales into per-lot rows, ordered by sale date.
///
/// A sale without a consumption trace becomes a single aggregate row.
pub fn expand_sale_rows(sales: &[SaleResult]) -> Vec<ReportRow> {
    let mut sorted: Vec<&SaleResult> = sales.iter().collect();
    sorted.sort_by_key(|sale| sale.sold);

    let mut rows = Vec::new();
    for sale in sorted {
        if sale.lots_used.is_empty() {
            rows.push(ReportRow {
                symbol: sale.symbol.clone(),
                name: sale.name.clone(),
                qty: sale.qty,
                acquired: sale.sold,
                sold: sale.sold,
                proceeds: sale.proceeds,
                acquisition_price: sale.acquisition_price,
                acquisition_fees: sale.acquisition_fees,
                sell_fees: sale.sell_fees,
                deemed_cost: sale.deemed_cost,
                method: sale.method,
                gain: sale.gain,
                lot_original_qty: sale.qty,
                lot_qty_before: sale.qty,
                lot_qty_after: Decimal::ZERO,
            });
            continue;
        }

        let has_qty = sale.qty.abs() > qty_epsilon();
        for lot in &sale.lots_used {
            let weight = if has_qty {
                lot.qty / sale.qty
            } else {
                Decimal::ZERO
            };
            let proceeds_piece = sale.proceeds * weight;
            let sell_fees_piece = sale.sell_fees * weight;
            let deemed_cost_piece = sale.deemed_cost * weight;
            let gain_piece = match sale.method {
                CostMethod::Deemed => proceeds_piece - deemed_cost_piece,
                CostMethod::Actual => {
                    proceeds_piece - lot.purchase_piece - lot.acquisition_fee_piece
                        - sell_fees_piece
                }
            };

            rows.push(ReportRow {
                symbol: sale.symbol.clone(),
                name: sale.name.clone(),
                qty: lot.qty,
                acquired: lot.acquired,
                sold: sale.sold,
                proceeds: proceeds_piece,
                acquisition_price: lot.purchase_piece,
                acquisition_fees: lot.acquisition_fee_piece,
                sell_fees: sell_fees_piece,
                deemed_cost: deemed_cost_piece,
                method: sale.method,
                gain: gain_piece,
                lot_original_qty: lot.lot_original_qty,
                lot_qty_before: lot.lot_qty_before,
                lot_qty_after: lot.lot_qty_after,
            });
        }
    }

    rows
}
