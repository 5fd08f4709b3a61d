//! Deterministic projection engine
//!
//! Pure functions turning card attributes and participant-edited parameters
//! into per-year and aggregate financial figures (business game) and
//! card-derived policy figures (policy game). No I/O happens here.
//!
//! Variable cost is always `cost per unit × volume`.

use crate::errors::{Result, ScenarioError};
use crate::template::policy::{PolicyAttributes, PolicyTargets};
use serde::{Deserialize, Serialize};

/// Growth rate applied when none is configured (20% per year)
pub const DEFAULT_GROWTH_RATE: f64 = 0.20;

/// Number of projected years when none is configured
pub const DEFAULT_YEARS: u8 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Participant-editable inputs for one projected year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearParameter {
    pub year: u8,
    pub monthly_sales: u64,
    pub unit_price: f64,
    pub variable_cost_per_unit: f64,
}

/// Derived figures for one year; always recomputed from its parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearResult {
    pub year: u8,
    pub monthly_sales: u64,
    pub unit_price: f64,
    pub variable_cost_per_unit: f64,
    pub annual_revenue: f64,
    pub annual_cost: f64,
    pub annual_profit: f64,
    /// Whole percent; 0 when revenue is 0
    pub profit_margin: i64,
}

/// Sums over all projected years
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub profit_margin: i64,
}

/// Single-month figures (same formulas without the ×12)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMetrics {
    pub monthly_revenue: f64,
    pub variable_cost: f64,
    pub monthly_profit: f64,
    pub profit_margin: i64,
}

/// Editable column of a [`YearParameter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearField {
    MonthlySales,
    UnitPrice,
    VariableCostPerUnit,
}

impl YearField {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "monthly_sales" | "sales" => Some(Self::MonthlySales),
            "unit_price" | "price" => Some(Self::UnitPrice),
            "variable_cost_per_unit" | "variable_cost" | "cost" => {
                Some(Self::VariableCostPerUnit)
            }
            _ => None,
        }
    }
}

/// Card-derived figures for the policy game
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyMetrics {
    /// Mean well-being contribution of the four cards (0-10)
    pub mean_well_being: f64,
    /// Mean feasibility of the four cards (0-10)
    pub mean_feasibility: f64,
    pub total_affected_residents: u64,
    /// The longest card duration bounds the whole rollout
    pub longest_implementation_months: u32,
    pub total_budget_million_yen: f64,
    pub baseline_population: u32,
    pub target_population: u32,
    pub target_well_being: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Yearly projection
// ─────────────────────────────────────────────────────────────────────────────

fn margin(profit: f64, revenue: f64) -> i64 {
    if revenue > 0.0 {
        (profit / revenue * 100.0).round() as i64
    } else {
        0
    }
}

fn grown_sales(base: u64, rate: f64, year: u8) -> u64 {
    let exponent = i32::from(year.saturating_sub(1));
    let grown = base as f64 * (1.0 + rate).powi(exponent);
    if grown.is_finite() && grown > 0.0 {
        grown.round() as u64
    } else {
        0
    }
}

/// Seed `years` parameters from year-1 values, compounding `growth_rate` on sales
pub fn initialize_years(
    base_sales: u64,
    base_price: f64,
    base_cost_per_unit: f64,
    growth_rate: f64,
    years: u8,
) -> Vec<YearParameter> {
    (1..=years)
        .map(|year| YearParameter {
            year,
            monthly_sales: grown_sales(base_sales, growth_rate, year),
            unit_price: base_price,
            variable_cost_per_unit: base_cost_per_unit,
        })
        .collect()
}

/// Derive one year's figures
pub fn compute_year(param: &YearParameter) -> YearResult {
    let volume = param.monthly_sales as f64 * 12.0;
    let annual_revenue = volume * param.unit_price;
    let annual_cost = volume * param.variable_cost_per_unit;
    let annual_profit = annual_revenue - annual_cost;

    YearResult {
        year: param.year,
        monthly_sales: param.monthly_sales,
        unit_price: param.unit_price,
        variable_cost_per_unit: param.variable_cost_per_unit,
        annual_revenue,
        annual_cost,
        annual_profit,
        profit_margin: margin(annual_profit, annual_revenue),
    }
}

/// Derive every year's figures
pub fn compute_years(params: &[YearParameter]) -> Vec<YearResult> {
    params.iter().map(compute_year).collect()
}

/// Sum revenue and cost, deriving profit and margin from the sums
pub fn compute_aggregate(results: &[YearResult]) -> Aggregate {
    let total_revenue: f64 = results.iter().map(|r| r.annual_revenue).sum();
    let total_cost: f64 = results.iter().map(|r| r.annual_cost).sum();
    let total_profit = total_revenue - total_cost;

    Aggregate {
        total_revenue,
        total_cost,
        total_profit,
        profit_margin: margin(total_profit, total_revenue),
    }
}

/// Recompute every year's sales from year 1's current sales; price and cost stay
pub fn apply_growth_rate(params: &[YearParameter], rate: f64) -> Vec<YearParameter> {
    let Some(first) = params.first() else {
        return Vec::new();
    };
    let base = first.monthly_sales;

    params
        .iter()
        .map(|p| YearParameter {
            monthly_sales: grown_sales(base, rate, p.year),
            ..*p
        })
        .collect()
}

/// Change one field of one year, leaving every other cell untouched
pub fn edit_year(
    params: &mut [YearParameter],
    year: u8,
    field: YearField,
    value: f64,
) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ScenarioError::validation(format!(
            "year {year}: value must be a non-negative number"
        )));
    }

    let param = params
        .iter_mut()
        .find(|p| p.year == year)
        .ok_or_else(|| ScenarioError::validation(format!("year {year} is not projected")))?;

    match field {
        YearField::MonthlySales => param.monthly_sales = value.round() as u64,
        YearField::UnitPrice => param.unit_price = value,
        YearField::VariableCostPerUnit => param.variable_cost_per_unit = value,
    }
    Ok(())
}

/// Single-month revenue, cost, profit and margin
pub fn monthly_metrics(monthly_sales: u64, unit_price: f64, cost_per_unit: f64) -> MonthlyMetrics {
    let volume = monthly_sales as f64;
    let monthly_revenue = volume * unit_price;
    let variable_cost = volume * cost_per_unit;
    let monthly_profit = monthly_revenue - variable_cost;

    MonthlyMetrics {
        monthly_revenue,
        variable_cost,
        monthly_profit,
        profit_margin: margin(monthly_profit, monthly_revenue),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy figures
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate the selected policy cards against the team's targets
pub fn compute_policy_metrics(
    cards: &[&PolicyAttributes],
    baseline_population: u32,
    targets: &PolicyTargets,
) -> PolicyMetrics {
    let count = cards.len() as f64;
    let mean = |f: fn(&PolicyAttributes) -> f64| {
        if cards.is_empty() {
            0.0
        } else {
            cards.iter().map(|c| f(c)).sum::<f64>() / count
        }
    };

    PolicyMetrics {
        mean_well_being: mean(|c| c.well_being_score),
        mean_feasibility: mean(|c| c.feasibility_score),
        total_affected_residents: cards.iter().map(|c| c.affected_residents).sum(),
        longest_implementation_months: cards
            .iter()
            .map(|c| c.implementation_months)
            .max()
            .unwrap_or_default(),
        total_budget_million_yen: cards.iter().map(|c| c.budget_million_yen).sum(),
        baseline_population,
        target_population: targets.target_population,
        target_well_being: targets.target_well_being,
    }
}
