//! FIFO acquisition-lot ledger and sale matching.
//!
//! One `FifoBook` lives for one calculation run. Sales consume lots oldest
//! first; each sale picks the cheaper of actual cost basis and the statutory
//! deemed acquisition cost, and records a per-lot consumption trace for the
//! audit trail.

use crate::error::LedgerError;
use crate::tax::rules::TaxRuleSet;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;

/// Holding periods of at least this many whole days qualify for the higher
/// deemed-cost rate.
const LONG_HOLDING_DAYS: i64 = 3650;

/// Quantities at or below this are treated as fully consumed.
pub(crate) fn qty_epsilon() -> Decimal {
    Decimal::new(1, 12)
}

/// One acquisition batch, tracked until sales consume it.
#[derive(Clone, Debug)]
pub struct Lot {
    pub acquired: NaiveDateTime,
    /// Remaining quantity; the lot is dropped once this reaches zero.
    pub qty: Decimal,
    /// Quantity at acquisition, kept through splits for audit display.
    pub original_qty: Decimal,
    /// Remaining purchase total for the remaining quantity.
    pub purchase_total: Decimal,
    /// Remaining acquisition fees for the remaining quantity.
    pub acquisition_fee_total: Decimal,
}

impl Lot {
    fn new(
        acquired: NaiveDateTime,
        qty: Decimal,
        purchase_total: Decimal,
        acquisition_fee_total: Decimal,
    ) -> Self {
        Self {
            acquired,
            qty,
            original_qty: qty,
            purchase_total,
            acquisition_fee_total,
        }
    }

    pub fn unit_purchase_cost(&self) -> Decimal {
        if self.qty > Decimal::ZERO {
            self.purchase_total / self.qty
        } else {
            Decimal::ZERO
        }
    }

    pub fn unit_acquisition_fee(&self) -> Decimal {
        if self.qty > Decimal::ZERO {
            self.acquisition_fee_total / self.qty
        } else {
            Decimal::ZERO
        }
    }
}

/// Cost-basis method chosen for a sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostMethod {
    Actual,
    Deemed,
}

impl fmt::Display for CostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CostMethod::Actual => "ACTUAL",
            CostMethod::Deemed => "DEEMED",
        })
    }
}

/// One slice taken from one lot during a sale.
#[derive(Clone, Debug, Serialize)]
pub struct LotConsumption {
    pub acquired: NaiveDateTime,
    pub qty: Decimal,
    pub purchase_piece: Decimal,
    pub acquisition_fee_piece: Decimal,
    pub total_cost_piece: Decimal,
    pub lot_original_qty: Decimal,
    pub lot_qty_before: Decimal,
    pub lot_qty_after: Decimal,
}

/// Aggregate result of one sale. Immutable once produced.
#[derive(Clone, Debug, Serialize)]
pub struct SaleResult {
    pub symbol: String,
    pub name: String,
    pub sold: NaiveDateTime,
    pub qty: Decimal,
    pub proceeds: Decimal,
    pub sell_fees: Decimal,
    /// Purchase cost actually consumed from the lots.
    pub acquisition_price: Decimal,
    /// Acquisition fees actually consumed from the lots.
    pub acquisition_fees: Decimal,
    /// acquisition_price + acquisition_fees + sell_fees.
    pub actual_cost: Decimal,
    pub deemed_cost: Decimal,
    pub method: CostMethod,
    pub gain: Decimal,
    pub lots_used: Vec<LotConsumption>,
}

impl SaleResult {
    /// The cost the chosen method deducts, as entered in the filing.
    pub fn cost_used(&self) -> Decimal {
        match self.method {
            CostMethod::Deemed => self.deemed_cost,
            CostMethod::Actual => self.actual_cost,
        }
    }
}

/// Per-symbol FIFO queues of acquisition lots.
pub struct FifoBook<'r> {
    lots: HashMap<String, VecDeque<Lot>>,
    rules: &'r TaxRuleSet,
}

impl<'r> FifoBook<'r> {
    pub fn new(rules: &'r TaxRuleSet) -> Self {
        Self {
            lots: HashMap::new(),
            rules,
        }
    }

    /// Outstanding lots for a symbol, oldest first.
    pub fn lots<'a>(&'a self, symbol: &str) -> impl Iterator<Item = &'a Lot> + 'a {
        self.lots.get(symbol).into_iter().flatten()
    }

    /// Total remaining quantity held for a symbol.
    pub fn held_quantity(&self, symbol: &str) -> Decimal {
        self.lots(symbol).map(|lot| lot.qty).sum()
    }

    /// Record an acquisition as the newest lot of the symbol.
    pub fn buy(
        &mut self,
        symbol: &str,
        date: NaiveDateTime,
        qty: Decimal,
        purchase_total: Decimal,
        acquisition_fee: Decimal,
    ) -> Result<(), LedgerError> {
        if qty <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveBuy(qty));
        }

        self.lots
            .entry(symbol.to_string())
            .or_default()
            .push_back(Lot::new(date, qty, purchase_total, acquisition_fee));
        Ok(())
    }

    /// Multiply every lot's remaining and original quantity by `ratio`.
    /// Monetary totals stay put, so unit costs scale inversely.
    pub fn apply_split(&mut self, symbol: &str, ratio: Decimal) -> Result<(), LedgerError> {
        if ratio <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveRatio(ratio));
        }

        if let Some(queue) = self.lots.get_mut(symbol) {
            for lot in queue.iter_mut() {
                lot.qty *= ratio;
                lot.original_qty *= ratio;
            }
        }
        Ok(())
    }

    /// Match a sale against the symbol's lots in FIFO order.
    ///
    /// Consumes `min(lot remaining, still needed)` from the front lot until
    /// the quantity is satisfied, allocating purchase cost and acquisition
    /// fees proportionally from the lot's current unit costs. The deemed
    /// cost rate follows the shortest-held consumed lot, and the method with
    /// the lower gain wins (deemed only when strictly lower).
    pub fn sell(
        &mut self,
        symbol: &str,
        name: &str,
        date: NaiveDateTime,
        qty: Decimal,
        proceeds: Decimal,
        sell_fee: Decimal,
    ) -> Result<SaleResult, LedgerError> {
        if qty <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveSell(qty));
        }

        let queue = self.lots.entry(symbol.to_string()).or_default();
        let mut remaining = qty;
        let mut lots_used = Vec::new();
        let mut acquisition_price = Decimal::ZERO;
        let mut acquisition_fees = Decimal::ZERO;

        while remaining > qty_epsilon() {
            let Some(lot) = queue.front_mut() else {
                return Err(LedgerError::InsufficientLots {
                    symbol: symbol.to_string(),
                    qty,
                    date: date.date(),
                });
            };

            let take = lot.qty.min(remaining);
            let lot_qty_before = lot.qty;
            let purchase_piece = lot.unit_purchase_cost() * take;
            let acquisition_fee_piece = lot.unit_acquisition_fee() * take;

            acquisition_price += purchase_piece;
            acquisition_fees += acquisition_fee_piece;

            lot.qty -= take;
            lot.purchase_total -= purchase_piece;
            lot.acquisition_fee_total -= acquisition_fee_piece;

            lots_used.push(LotConsumption {
                acquired: lot.acquired,
                qty: take,
                purchase_piece,
                acquisition_fee_piece,
                total_cost_piece: purchase_piece + acquisition_fee_piece,
                lot_original_qty: lot.original_qty,
                lot_qty_before,
                lot_qty_after: lot.qty,
            });
            remaining -= take;

            if lot.qty <= qty_epsilon() {
                queue.pop_front();
            }
        }

        // The shortest-held consumed lot decides the deemed-cost rate.
        let min_holding_days = lots_used
            .iter()
            .map(|lot| (date - lot.acquired).num_days())
            .min()
            .unwrap_or(0);
        let deemed_rate = if min_holding_days >= LONG_HOLDING_DAYS {
            self.rules.deemed_cost_10y_or_more
        } else {
            self.rules.deemed_cost_under_10y
        };

        let deemed_cost = proceeds * deemed_rate;
        let actual_cost = acquisition_price + acquisition_fees;
        let gain_actual = proceeds - actual_cost - sell_fee;
        let gain_deemed = proceeds - deemed_cost;

        let (method, gain) = if gain_deemed < gain_actual {
            (CostMethod::Deemed, gain_deemed)
        } else {
            (CostMethod::Actual, gain_actual)
        };
        debug!(
            "sell {qty} {symbol}: {} lots, {method} method, gain {gain}",
            lots_used.len()
        );

        Ok(SaleResult {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sold: date,
            qty,
            proceeds,
            sell_fees: sell_fee,
            acquisition_price,
            acquisition_fees,
            actual_cost: actual_cost + sell_fee,
            deemed_cost,
            method,
            gain,
            lots_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::rules::resolve_rules_for_year;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn book() -> FifoBook<'static> {
        let (_, rules) = resolve_rules_for_year(2025).unwrap();
        FifoBook::new(rules)
    }

    #[test]
    fn two_sells_fully_consume_one_lot() {
        let mut book = book();
        book.buy("VWCE", dt(2024, 1, 10), dec!(1.0), dec!(4.0), dec!(0))
            .unwrap();

        let sale1 = book
            .sell("VWCE", "", dt(2025, 2, 10), dec!(0.6), dec!(2.5), dec!(0))
            .unwrap();
        let sale2 = book
            .sell("VWCE", "", dt(2025, 2, 15), dec!(0.4), dec!(1.8), dec!(0))
            .unwrap();

        assert_eq!(sale1.acquisition_price + sale2.acquisition_price, dec!(4.0));
        assert_eq!(sale1.qty + sale2.qty, dec!(1.0));
        assert_eq!(sale1.gain + sale2.gain, dec!(0.3));
        assert_eq!(book.held_quantity("VWCE"), Decimal::ZERO);
    }

    #[test]
    fn fifo_consumes_the_oldest_lot_first() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(40), dec!(1))
            .unwrap();
        book.buy("NOKIA", dt(2024, 6, 1), dec!(10), dec!(60), dec!(1))
            .unwrap();

        let sale = book
            .sell("NOKIA", "", dt(2025, 3, 1), dec!(10), dec!(70), dec!(0))
            .unwrap();

        assert_eq!(sale.lots_used.len(), 1);
        assert_eq!(sale.lots_used[0].acquired, dt(2024, 1, 1));
        assert_eq!(sale.acquisition_price, dec!(40));
        // Only the newer lot remains.
        let remaining: Vec<_> = book.lots("NOKIA").collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].acquired, dt(2024, 6, 1));
    }

    #[test]
    fn partial_consumption_spans_lots() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(40), dec!(2))
            .unwrap();
        book.buy("NOKIA", dt(2024, 6, 1), dec!(10), dec!(60), dec!(4))
            .unwrap();

        let sale = book
            .sell("NOKIA", "", dt(2025, 3, 1), dec!(15), dec!(120), dec!(0))
            .unwrap();

        assert_eq!(sale.lots_used.len(), 2);
        assert_eq!(sale.lots_used[0].qty, dec!(10));
        assert_eq!(sale.lots_used[1].qty, dec!(5));
        // All of lot 1 (40 + 2) and half of lot 2 (30 + 2).
        assert_eq!(sale.acquisition_price, dec!(70));
        assert_eq!(sale.acquisition_fees, dec!(4));
        assert_eq!(book.held_quantity("NOKIA"), dec!(5));
    }

    #[test]
    fn oversell_fails_with_insufficient_lots() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(5), dec!(20), dec!(0))
            .unwrap();

        let err = book
            .sell("NOKIA", "", dt(2025, 3, 1), dec!(10), dec!(80), dec!(0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientLots { .. }));

        let err = book
            .sell("EMPTY", "", dt(2025, 3, 1), dec!(1), dec!(10), dec!(0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientLots { .. }));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let mut book = book();
        assert!(book
            .buy("NOKIA", dt(2024, 1, 1), dec!(0), dec!(10), dec!(0))
            .is_err());
        assert!(book
            .sell("NOKIA", "", dt(2025, 1, 1), dec!(-1), dec!(10), dec!(0))
            .is_err());
        assert!(book.apply_split("NOKIA", dec!(0)).is_err());
    }

    #[test]
    fn holding_of_3650_days_uses_the_long_rate() {
        let acquired = dt(2015, 6, 15);
        let sold = acquired + Duration::days(3650);

        let mut book = book();
        book.buy("NOKIA", acquired, dec!(10), dec!(1000), dec!(0))
            .unwrap();
        let sale = book
            .sell("NOKIA", "", sold, dec!(10), dec!(2000), dec!(0))
            .unwrap();
        assert_eq!(sale.deemed_cost, dec!(800.00)); // 40 %
    }

    #[test]
    fn holding_of_3649_days_uses_the_short_rate() {
        let acquired = dt(2015, 6, 15);
        let sold = acquired + Duration::days(3649);

        let mut book = book();
        book.buy("NOKIA", acquired, dec!(10), dec!(1000), dec!(0))
            .unwrap();
        let sale = book
            .sell("NOKIA", "", sold, dec!(10), dec!(2000), dec!(0))
            .unwrap();
        assert_eq!(sale.deemed_cost, dec!(400.00)); // 20 %
    }

    #[test]
    fn shortest_held_lot_decides_the_rate() {
        let mut book = book();
        book.buy("NOKIA", dt(2010, 1, 1), dec!(10), dec!(100), dec!(0))
            .unwrap();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(100), dec!(0))
            .unwrap();

        // Consumes both lots; the 2024 lot is the youngest, so under 10y.
        let sale = book
            .sell("NOKIA", "", dt(2025, 6, 1), dec!(20), dec!(1000), dec!(0))
            .unwrap();
        assert_eq!(sale.deemed_cost, dec!(200.00)); // 20 %
    }

    #[test]
    fn deemed_method_wins_when_strictly_cheaper() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(100), dec!(0))
            .unwrap();

        let sale = book
            .sell("NOKIA", "", dt(2025, 3, 1), dec!(10), dec!(2000), dec!(0))
            .unwrap();
        // actual gain 1900, deemed gain 2000 - 400 = 1600
        assert_eq!(sale.method, CostMethod::Deemed);
        assert_eq!(sale.gain, dec!(1600.00));
        assert_eq!(sale.cost_used(), dec!(400.00));
    }

    #[test]
    fn actual_method_wins_ties_and_higher_deemed_gains() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(900), dec!(0))
            .unwrap();

        let sale = book
            .sell("NOKIA", "", dt(2025, 3, 1), dec!(10), dec!(1000), dec!(5))
            .unwrap();
        // actual gain 95, deemed gain 800
        assert_eq!(sale.method, CostMethod::Actual);
        assert_eq!(sale.gain, dec!(95));
        assert_eq!(sale.actual_cost, dec!(905));
    }

    #[test]
    fn gain_is_the_minimum_of_both_methods() {
        let mut book = book();
        book.buy("A", dt(2024, 1, 1), dec!(1), dec!(50), dec!(1))
            .unwrap();
        book.buy("B", dt(2024, 1, 1), dec!(1), dec!(10), dec!(1))
            .unwrap();

        for (symbol, proceeds) in [("A", dec!(100)), ("B", dec!(100))] {
            let sale = book
                .sell(symbol, "", dt(2025, 1, 1), dec!(1), proceeds, dec!(2))
                .unwrap();
            let gain_actual = sale.proceeds - sale.actual_cost;
            let gain_deemed = sale.proceeds - sale.deemed_cost;
            assert_eq!(sale.gain, gain_actual.min(gain_deemed));
        }
    }

    #[test]
    fn split_scales_quantities_but_not_money() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(100), dec!(2))
            .unwrap();
        book.apply_split("NOKIA", dec!(4)).unwrap();

        let lots: Vec<_> = book.lots("NOKIA").cloned().collect();
        assert_eq!(lots[0].qty, dec!(40));
        assert_eq!(lots[0].original_qty, dec!(40));
        assert_eq!(lots[0].purchase_total, dec!(100));

        // Unit costs scale inversely: selling everything recovers the
        // original totals.
        let sale = book
            .sell("NOKIA", "", dt(2025, 1, 1), dec!(40), dec!(500), dec!(0))
            .unwrap();
        assert_eq!(sale.acquisition_price, dec!(100));
        assert_eq!(sale.acquisition_fees, dec!(2));
    }

    #[test]
    fn reverse_split_halves_quantities() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(100), dec!(0))
            .unwrap();
        book.apply_split("NOKIA", dec!(0.5)).unwrap();
        assert_eq!(book.held_quantity("NOKIA"), dec!(5));
    }

    #[test]
    fn consumption_trace_records_before_and_after() {
        let mut book = book();
        book.buy("NOKIA", dt(2024, 1, 1), dec!(10), dec!(100), dec!(0))
            .unwrap();

        let sale = book
            .sell("NOKIA", "", dt(2025, 1, 1), dec!(4), dec!(60), dec!(0))
            .unwrap();
        let trace = &sale.lots_used[0];
        assert_eq!(trace.lot_qty_before, dec!(10));
        assert_eq!(trace.lot_qty_after, dec!(6));
        assert_eq!(trace.lot_original_qty, dec!(10));
        assert_eq!(trace.purchase_piece, dec!(40));
    }
}
