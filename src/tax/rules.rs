//! Finnish capital-taxation rule sets, keyed by tax year.

use crate::error::RuleError;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rates and thresholds for one rule year. Never mutated after creation.
#[derive(Clone, Debug, Serialize)]
pub struct TaxRuleSet {
    /// Capital income up to this is taxed at the low rate, the rest at the
    /// high rate.
    pub capital_income_bracket_eur: Decimal,
    pub capital_tax_low: Decimal,
    pub capital_tax_high: Decimal,
    /// Taxable share of dividends from listed companies.
    pub listed_dividend_taxable_share: Decimal,
    /// Deemed acquisition cost for holdings under 10 years.
    pub deemed_cost_under_10y: Decimal,
    /// Deemed acquisition cost for holdings of 10 years or more.
    pub deemed_cost_10y_or_more: Decimal,
    /// Custody fees are deductible only beyond this amount.
    pub custody_deductible_excess: Decimal,
}

static TAX_RULES_BY_YEAR: Lazy<BTreeMap<i32, TaxRuleSet>> = Lazy::new(|| {
    BTreeMap::from([(
        2025,
        TaxRuleSet {
            capital_income_bracket_eur: Decimal::new(30_000, 0),
            capital_tax_low: Decimal::new(30, 2),
            capital_tax_high: Decimal::new(34, 2),
            listed_dividend_taxable_share: Decimal::new(85, 2),
            deemed_cost_under_10y: Decimal::new(20, 2),
            deemed_cost_10y_or_more: Decimal::new(40, 2),
            custody_deductible_excess: Decimal::new(50, 0),
        },
    )])
});

/// Years with a registered rule set, ascending.
pub fn known_rule_years() -> Vec<i32> {
    TAX_RULES_BY_YEAR.keys().copied().collect()
}

/// Resolve the rule set governing a tax year.
///
/// An exact match wins. Otherwise the greatest known rule year at or below
/// the requested one applies, and when the requested year predates every
/// known year, the latest known year applies. Only an empty rule table is an
/// error.
pub fn resolve_rules_for_year(year: i32) -> Result<(i32, &'static TaxRuleSet), RuleError> {
    let table = &*TAX_RULES_BY_YEAR;

    match table
        .range(..=year)
        .next_back()
        .or_else(|| table.iter().next_back())
    {
        Some((rule_year, rules)) => Ok((*rule_year, rules)),
        None => Err(RuleError::NoRuleSets),
    }
}

/// Two-bracket capital tax estimate. Zero when net capital income is not
/// positive.
pub fn estimate_capital_tax(net_capital_income: Decimal, rules: &TaxRuleSet) -> Decimal {
    if net_capital_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let low = net_capital_income.min(rules.capital_income_bracket_eur);
    let high = (net_capital_income - rules.capital_income_bracket_eur).max(Decimal::ZERO);
    low * rules.capital_tax_low + high * rules.capital_tax_high
}
