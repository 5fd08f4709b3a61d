//! Business-plan game
//!
//! Persona (♥) sets market size and monthly sales, the problem (♦) sets the
//! unit price, the partner (♣) sets the cost per unit, and the job type (♠)
//! sets feasibility. Teams tune a 5-year projection before submitting.

use super::{Category, Template, TextField};
use crate::card::Suit;
use crate::config::CardQuestConfig;
use crate::lenient;
use crate::projection::{
    self, Aggregate, MonthlyMetrics, YearParameter, YearResult, compute_aggregate, compute_years,
    initialize_years,
};
use crate::prompt::{Submission, card_section, grouped, yen};
use crate::selection::FinalSelection;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const PERSONA: usize = 0;
const PROBLEM: usize = 1;
const PARTNER: usize = 2;
const JOB_TYPE: usize = 3;

/// Business-plan template marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusinessPlan;

/// Numeric attributes of business cards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAttributes {
    /// Reachable market (ten-thousands of people or companies)
    #[serde(default, deserialize_with = "lenient::count")]
    pub market_size: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub monthly_sales: u64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub unit_price: f64,
    /// Cost per unit sold
    #[serde(default, deserialize_with = "lenient::number")]
    pub variable_cost: f64,
    /// 0-10
    #[serde(default, deserialize_with = "lenient::number")]
    pub feasibility_score: f64,
}

/// Projection inputs; empty until the selection is final
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessParameters {
    pub years: Vec<YearParameter>,
}

/// Trusted figures merged into the evaluation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetrics {
    pub monthly_revenue: f64,
    pub monthly_profit: f64,
    pub variable_cost: f64,
    pub profit_margin: i64,
    pub feasibility_score: f64,
    pub market_size: u64,
    pub years: Vec<YearResult>,
    pub aggregate: Aggregate,
}

/// Four 0-25 sub-scores adding up to the overall score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    #[serde(default, deserialize_with = "lenient::integer")]
    pub market_potential: i64,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub feasibility: i64,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub differentiation: i64,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub plan_quality: i64,
}

/// Evaluator answer for a business plan
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAssessment {
    #[serde(default, deserialize_with = "lenient::string")]
    pub improved_plan: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub executive_summary: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub target_customer: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub value_proposition: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub revenue_model: String,
    /// 0-100
    #[serde(default, deserialize_with = "lenient::integer")]
    pub score: i64,
    #[serde(default, deserialize_with = "lenient::object")]
    pub score_breakdown: ScoreBreakdown,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub issues: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub next_actions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub mentor_comment: String,
}

impl BusinessAssessment {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }
}

/// Qualitative reading of the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    InvestorReady,
    Promising,
    NeedsRework,
    Redesign,
}

impl ScoreBand {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 80 => Self::InvestorReady,
            s if s >= 60 => Self::Promising,
            s if s >= 40 => Self::NeedsRework,
            _ => Self::Redesign,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::InvestorReady => "ready to show investors",
            Self::Promising => "good idea, needs improvement",
            Self::NeedsRework => "has direction, needs a fundamental rethink",
            Self::Redesign => "needs a major redesign",
        }
    }
}

impl BusinessPlan {
    /// Year-1 values from the cards, falling back when a card carries 0
    fn year_one(selection: &FinalSelection<Self>, cfg: &CardQuestConfig) -> (u64, f64, f64) {
        let fallback = &cfg.projection;
        let cards = selection.cards();
        let sales = cards[PERSONA].attributes.monthly_sales;
        let price = cards[PROBLEM].attributes.unit_price;
        let cost = cards[PARTNER].attributes.variable_cost;
        (
            if sales > 0 { sales } else { fallback.fallback_monthly_sales },
            if price > 0.0 { price } else { fallback.fallback_unit_price },
            if cost > 0.0 { cost } else { fallback.fallback_variable_cost },
        )
    }
}

impl Template for BusinessPlan {
    const NAME: &'static str = "business";

    const CATEGORIES: [Category; 4] = [
        Category {
            key: "persona",
            suit: Suit::Heart,
            label: "Persona",
            question: "who is it for",
        },
        Category {
            key: "problem",
            suit: Suit::Diamond,
            label: "Problem",
            question: "what does it solve",
        },
        Category {
            key: "partner",
            suit: Suit::Club,
            label: "Partner",
            question: "who do we team up with",
        },
        Category {
            key: "job_type",
            suit: Suit::Spade,
            label: "Job type",
            question: "how is it delivered",
        },
    ];

    const TEXT_FIELDS: &'static [TextField] = &[
        TextField {
            key: "solution_name",
            label: "Solution name",
        },
        TextField {
            key: "user_benefit",
            label: "User benefit",
        },
        TextField {
            key: "advantage",
            label: "Advantage over competitors",
        },
        TextField {
            key: "plan_revision",
            label: "Plan revisions and notes",
        },
    ];

    type Attributes = BusinessAttributes;
    type Parameters = BusinessParameters;
    type Metrics = BusinessMetrics;
    type Assessment = BusinessAssessment;

    fn default_parameters(_cfg: &CardQuestConfig) -> BusinessParameters {
        BusinessParameters::default()
    }

    fn prepare_parameters(
        params: &mut BusinessParameters,
        selection: &FinalSelection<Self>,
        cfg: &CardQuestConfig,
    ) {
        if !params.years.is_empty() {
            return;
        }
        let (sales, price, cost) = Self::year_one(selection, cfg);
        params.years = initialize_years(
            sales,
            price,
            cost,
            cfg.projection.growth_rate,
            cfg.projection.years,
        );
        tracing::debug!(years = params.years.len(), "Projection initialized from cards");
    }

    fn compute_metrics(
        selection: &FinalSelection<Self>,
        params: &BusinessParameters,
        cfg: &CardQuestConfig,
    ) -> BusinessMetrics {
        let monthly: MonthlyMetrics = match params.years.first() {
            Some(y1) => {
                projection::monthly_metrics(y1.monthly_sales, y1.unit_price, y1.variable_cost_per_unit)
            }
            None => {
                let (sales, price, cost) = Self::year_one(selection, cfg);
                projection::monthly_metrics(sales, price, cost)
            }
        };
        let years = compute_years(&params.years);
        let aggregate = compute_aggregate(&years);

        BusinessMetrics {
            monthly_revenue: monthly.monthly_revenue,
            monthly_profit: monthly.monthly_profit,
            variable_cost: monthly.variable_cost,
            profit_margin: monthly.profit_margin,
            feasibility_score: selection.cards()[JOB_TYPE].attributes.feasibility_score,
            market_size: selection.cards()[PERSONA].attributes.market_size,
            years,
            aggregate,
        }
    }

    fn render_prompt(submission: &Submission<Self>, metrics: &BusinessMetrics) -> String {
        let selection = &submission.selection;

        let mut cards = String::new();
        for (category, card) in selection.iter() {
            cards.push_str(&card_section(&category, card));
            let attrs = &card.attributes;
            let _ = match category.suit {
                Suit::Heart => writeln!(
                    cards,
                    "- Market size: {} (ten-thousands)\n- Expected monthly sales: {} units",
                    grouped(attrs.market_size as f64),
                    grouped(attrs.monthly_sales as f64)
                ),
                Suit::Diamond => writeln!(cards, "- Expected unit price: {}", yen(attrs.unit_price)),
                Suit::Club => writeln!(cards, "- Variable cost per unit: {}", yen(attrs.variable_cost)),
                Suit::Spade => {
                    writeln!(cards, "- Feasibility score: {}/10", attrs.feasibility_score)
                }
            };
            cards.push('\n');
        }

        let mut table = String::from(
            "| Year | Monthly sales | Unit price | Cost per unit | Annual revenue | Annual cost | Annual profit | Margin |\n|---|---|---|---|---|---|---|---|\n",
        );
        for y in &metrics.years {
            let _ = writeln!(
                table,
                "| {} | {} | {} | {} | {} | {} | {} | {}% |",
                y.year,
                grouped(y.monthly_sales as f64),
                yen(y.unit_price),
                yen(y.variable_cost_per_unit),
                yen(y.annual_revenue),
                yen(y.annual_cost),
                yen(y.annual_profit),
                y.profit_margin
            );
        }
        let agg = &metrics.aggregate;
        let _ = writeln!(
            table,
            "| Total | | | | {} | {} | {} | {}% |",
            yen(agg.total_revenue),
            yen(agg.total_cost),
            yen(agg.total_profit),
            agg.profit_margin
        );

        format!(
            r#"You are an experienced business plan consultant.
Improve and strengthen the business plan a student team wrote, then evaluate it strictly.

## Team
- Team: {team}
- Members: {members}
- Date: {date}

## Selected cards

{cards}## Business metrics (computed, do not recalculate)
- Monthly revenue: {monthly_revenue}
- Monthly variable cost: {monthly_cost} (cost per unit x units sold)
- Monthly profit: {monthly_profit}
- Profit margin: {margin}%
- Feasibility: {feasibility}/10
- Market size: {market_size} (ten-thousands)

## 5-year projection

{table}
## Team input

### Solution name
{solution_name}

### User benefit
{user_benefit}

### Advantage over competitors
{advantage}

### Plan revisions and notes
{plan_revision}

---

## Output

Answer with this JSON object only. Do not add any text outside the JSON:

{{
  "improvedPlan": "full improved business plan (about 400 characters) with concrete measures, numeric goals and key risk responses",
  "executiveSummary": "executive summary (200 characters max) that tells an investor why this is attractive",
  "targetCustomer": "detailed target customer definition (150 characters max)",
  "valueProposition": "value proposition in one sentence (100 characters max)",
  "revenueModel": "revenue model explanation (200 characters max)",
  "score": integer 0-100,
  "scoreBreakdown": {{
    "marketPotential": integer 0-25,
    "feasibility": integer 0-25,
    "differentiation": integer 0-25,
    "planQuality": integer 0-25
  }},
  "strengths": ["strength 1", "strength 2", "strength 3"],
  "issues": ["issue or risk 1", "issue or risk 2", "issue or risk 3"],
  "nextActions": ["topic for group work 1", "topic 2", "topic 3"],
  "mentorComment": "overall mentor comment (300 characters max) balancing encouragement with hard critique"
}}

Scoring (be strict):
- 80 or more: ready to show investors
- 60-79: good idea, needs improvement
- 40-59: has direction, needs a fundamental rethink
- below 40: needs a major redesign

Acknowledge the team's enthusiasm but judge objectively whether this works as a business."#,
            team = submission.team.name,
            members = submission.team.members.replace('\n', ", "),
            date = submission.submitted_on.format("%Y-%m-%d"),
            cards = cards,
            monthly_revenue = yen(metrics.monthly_revenue),
            monthly_cost = yen(metrics.variable_cost),
            monthly_profit = yen(metrics.monthly_profit),
            margin = metrics.profit_margin,
            feasibility = metrics.feasibility_score,
            market_size = grouped(metrics.market_size as f64),
            table = table,
            solution_name = submission.text("solution_name"),
            user_benefit = submission.text("user_benefit"),
            advantage = submission.text("advantage"),
            plan_revision = submission.text("plan_revision"),
        )
    }

    fn system_prompt() -> &'static str {
        "You evaluate student business plans. Return only a JSON object, without markdown code fences."
    }

    fn headline(submission: &Submission<Self>) -> String {
        submission.text("solution_name").to_string()
    }

    fn headline_score(assessment: &BusinessAssessment) -> String {
        assessment.score.to_string()
    }
}
