use anyhow::bail;
use cardquest_scenario::prompt::{grouped, yen};
use cardquest_scenario::{Aggregate, CardQuestConfig, YearResult, projection};
use clap::Parser;
use serde::Serialize;

#[derive(Debug, Parser)]
pub struct ProjectArgs {
    /// Year-1 monthly sales (units)
    #[arg(long, value_name = "UNITS")]
    pub sales: Option<u64>,

    /// Unit price (yen)
    #[arg(long)]
    pub price: Option<f64>,

    /// Variable cost per unit (yen)
    #[arg(long)]
    pub cost: Option<f64>,

    /// Yearly sales growth (0.2 = 20%)
    #[arg(long)]
    pub growth: Option<f64>,

    /// Number of projected years
    #[arg(long)]
    pub years: Option<u8>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Projection {
    years: Vec<YearResult>,
    aggregate: Aggregate,
}

impl ProjectArgs {
    pub fn execute(&self, cfg: &CardQuestConfig) -> anyhow::Result<()> {
        let projection = self.compute(cfg)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&projection)?);
        } else {
            print!("{}", render(&projection));
        }
        Ok(())
    }

    fn compute(&self, cfg: &CardQuestConfig) -> anyhow::Result<Projection> {
        let defaults = &cfg.projection;
        let sales = self.sales.unwrap_or(defaults.fallback_monthly_sales);
        let price = self.price.unwrap_or(defaults.fallback_unit_price);
        let cost = self.cost.unwrap_or(defaults.fallback_variable_cost);
        let growth = self.growth.unwrap_or(defaults.growth_rate);
        let years = self.years.unwrap_or(defaults.years);

        if !(price.is_finite() && price >= 0.0) || !(cost.is_finite() && cost >= 0.0) {
            bail!("price and cost must be non-negative numbers");
        }
        if !growth.is_finite() || growth <= -1.0 {
            bail!("growth must be greater than -1");
        }

        let params = projection::initialize_years(sales, price, cost, growth, years);
        let years = projection::compute_years(&params);
        let aggregate = projection::compute_aggregate(&years);
        Ok(Projection { years, aggregate })
    }
}

fn render(projection: &Projection) -> String {
    let mut out = format!(
        "{:>4} {:>10} {:>12} {:>12} {:>16} {:>16} {:>16} {:>7}\n",
        "Year", "Sales/mo", "Price", "Cost/unit", "Revenue", "Cost", "Profit", "Margin"
    );
    for y in &projection.years {
        out.push_str(&format!(
            "{:>4} {:>10} {:>12} {:>12} {:>16} {:>16} {:>16} {:>6}%\n",
            y.year,
            grouped(y.monthly_sales as f64),
            yen(y.unit_price),
            yen(y.variable_cost_per_unit),
            yen(y.annual_revenue),
            yen(y.annual_cost),
            yen(y.annual_profit),
            y.profit_margin
        ));
    }
    let agg = &projection.aggregate;
    out.push_str(&format!(
        "{:>4} {:>10} {:>12} {:>12} {:>16} {:>16} {:>16} {:>6}%\n",
        "All",
        "",
        "",
        "",
        yen(agg.total_revenue),
        yen(agg.total_cost),
        yen(agg.total_profit),
        agg.profit_margin
    ));
    out
}
