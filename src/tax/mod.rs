// Tax module - Finnish capital-gains calculations (FIFO lots, deemed cost, rule sets)

pub mod calculation;
pub mod fifo;
pub mod rules;

pub use calculation::{
    calculate, calculate_transactions, CalculationOptions, CalculationResult, DividendRecord,
    InterestRecord, SaleTotals,
};
pub use fifo::{CostMethod, FifoBook, Lot, LotConsumption, SaleResult};
pub use rules::{estimate_capital_tax, resolve_rules_for_year, TaxRuleSet};
