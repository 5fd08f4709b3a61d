//! Policy-plan game
//!
//! A team plays the council of a shrinking municipality (baseline population
//! 10,000). Persona (♠), problem (♣), partner (♦) and action (♥) cards carry
//! well-being and cost figures; the evaluator scores the plan on 8 well-being
//! axes and simulates population with and without the policy.

use super::{Category, Template, TextField};
use crate::card::Suit;
use crate::config::CardQuestConfig;
use crate::errors::{Result, ScenarioError};
use crate::lenient;
use crate::projection::{PolicyMetrics, compute_policy_metrics};
use crate::prompt::{Submission, card_section, grouped};
use crate::selection::FinalSelection;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Points available on each well-being axis
pub const AXIS_MAX: f64 = 12.5;

/// Policy-plan template marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyPlan;

/// Numeric attributes of policy cards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAttributes {
    /// Well-being contribution, 0-10
    #[serde(default, deserialize_with = "lenient::number")]
    pub well_being_score: f64,
    /// 0-10
    #[serde(default, deserialize_with = "lenient::number")]
    pub feasibility_score: f64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub affected_residents: u64,
    #[serde(default, deserialize_with = "lenient::count_u32")]
    pub implementation_months: u32,
    /// Budget per year in millions of yen
    #[serde(default, deserialize_with = "lenient::number")]
    pub budget_million_yen: f64,
}

/// Team goals measured against the baseline population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTargets {
    pub target_population: u32,
    pub target_well_being: u32,
}

impl Default for PolicyTargets {
    fn default() -> Self {
        Self {
            target_population: 12_000,
            target_well_being: 75,
        }
    }
}

/// Scores on the eight well-being axes (0-12.5 each)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellBeingScores {
    #[serde(default, deserialize_with = "lenient::number")]
    pub economic: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub social_connection: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub health_medical: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub autonomy: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub generosity: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub trust: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub safety: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub nature: f64,
    /// Sum of the axes, 0-100; recomputed locally
    #[serde(default, deserialize_with = "lenient::number")]
    pub total: f64,
}

impl WellBeingScores {
    pub fn axes(&self) -> [f64; 8] {
        [
            self.economic,
            self.social_connection,
            self.health_medical,
            self.autonomy,
            self.generosity,
            self.trust,
            self.safety,
            self.nature,
        ]
    }

    /// Sum of the axes rounded to one decimal
    pub fn axis_sum(&self) -> f64 {
        (self.axes().iter().sum::<f64>() * 10.0).round() / 10.0
    }
}

/// Population at 5, 10 and 20 years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopulationPoint {
    #[serde(default, deserialize_with = "lenient::count")]
    pub y5: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub y10: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub y20: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationSim {
    #[serde(default, deserialize_with = "lenient::object")]
    pub without_policy: PopulationPoint,
    #[serde(default, deserialize_with = "lenient::object")]
    pub with_policy: PopulationPoint,
}

/// Evaluator's judgement against the team's targets
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankJudge {
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub population_achieved: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub well_being_achieved: bool,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub population_diff: i64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub well_being_diff: f64,
}

/// Evaluator answer for a policy plan
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAssessment {
    #[serde(default, deserialize_with = "lenient::string")]
    pub proposal: String,
    #[serde(default, deserialize_with = "lenient::object")]
    pub well_being_scores: WellBeingScores,
    #[serde(default, deserialize_with = "lenient::object")]
    pub population_sim: PopulationSim,
    #[serde(default, deserialize_with = "lenient::object")]
    pub rank_judge: RankJudge,
    /// S, A, B, C or D; empty when the evaluator gave none
    #[serde(default, deserialize_with = "lenient::string")]
    pub rank: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub challenges: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub next_actions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub comment: String,
}

impl PolicyAssessment {
    pub fn rank(&self) -> Option<PolicyRank> {
        PolicyRank::parse(&self.rank)
    }
}

/// Overall policy rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyRank {
    S,
    A,
    B,
    C,
    D,
}

impl PolicyRank {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "S" => Some(Self::S),
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::S => "population target met and growing, well-being 85+",
            Self::A => "population target met, well-being 70+",
            Self::B => "80% of the target met, well-being 55+",
            Self::C => "some improvement, well-being 40+",
            Self::D => "limited effect, well-being below 40",
        }
    }
}

impl Template for PolicyPlan {
    const NAME: &'static str = "policy";

    const CATEGORIES: [Category; 4] = [
        Category {
            key: "persona",
            suit: Suit::Spade,
            label: "Persona",
            question: "whose problem is it",
        },
        Category {
            key: "problem",
            suit: Suit::Club,
            label: "Problem",
            question: "what is happening",
        },
        Category {
            key: "partner",
            suit: Suit::Diamond,
            label: "Partner",
            question: "who do we work with",
        },
        Category {
            key: "action",
            suit: Suit::Heart,
            label: "Action",
            question: "what do we do",
        },
    ];

    const TEXT_FIELDS: &'static [TextField] = &[TextField {
        key: "plan_text",
        label: "Policy proposal",
    }];

    type Attributes = PolicyAttributes;
    type Parameters = PolicyTargets;
    type Metrics = PolicyMetrics;
    type Assessment = PolicyAssessment;

    fn default_parameters(cfg: &CardQuestConfig) -> PolicyTargets {
        PolicyTargets {
            target_population: cfg.policy.default_target_population,
            target_well_being: cfg.policy.default_target_well_being,
        }
    }

    fn validate_parameters(params: &PolicyTargets, cfg: &CardQuestConfig) -> Result<()> {
        let policy = &cfg.policy;
        if !(policy.min_target_population..=policy.max_target_population)
            .contains(&params.target_population)
        {
            return Err(ScenarioError::validation(format!(
                "target population must be between {} and {}",
                policy.min_target_population, policy.max_target_population
            )));
        }
        if !(policy.min_target_well_being..=policy.max_target_well_being)
            .contains(&params.target_well_being)
        {
            return Err(ScenarioError::validation(format!(
                "target well-being must be between {} and {}",
                policy.min_target_well_being, policy.max_target_well_being
            )));
        }
        Ok(())
    }

    fn compute_metrics(
        selection: &FinalSelection<Self>,
        params: &PolicyTargets,
        cfg: &CardQuestConfig,
    ) -> PolicyMetrics {
        let cards: Vec<&PolicyAttributes> = selection.iter().map(|(_, c)| &c.attributes).collect();
        compute_policy_metrics(&cards, cfg.policy.baseline_population, params)
    }

    fn render_prompt(submission: &Submission<Self>, metrics: &PolicyMetrics) -> String {
        let mut cards = String::new();
        for (category, card) in submission.selection.iter() {
            cards.push_str(&card_section(&category, card));
            let a = &card.attributes;
            let _ = writeln!(
                cards,
                "- Well-being contribution: {}/10, feasibility: {}/10\n- Affected residents: {}, implementation: {} months, budget: {} million yen per year\n",
                a.well_being_score,
                a.feasibility_score,
                grouped(a.affected_residents as f64),
                a.implementation_months,
                a.budget_million_yen
            );
        }

        format!(
            r#"You are the policy evaluation AI for a shrinking municipality.
Evaluate the four cards this team chose and their policy proposal.

## Team
- Team: {team}
- Members: {members}
- Date: {date}

## Selected cards

{cards}## Card figures (computed, do not recalculate)
- Mean well-being contribution: {mean_wb:.1}/10
- Mean feasibility: {mean_feas:.1}/10
- Affected residents (total): {residents}
- Longest implementation: {months} months
- Total budget: {budget} million yen per year

## Team proposal
{plan}

## Team targets
- Target population: {target_pop} (starting from {baseline})
- Target well-being index: {target_wb} (out of 100)

## Criteria

### Eight well-being axes (12.5 points each, 100 total)
1. economic: income, jobs, industry
2. socialConnection: community, mutual support
3. healthMedical: healthy life expectancy, access to care
4. autonomy: freedom to choose how to live
5. generosity: volunteering, helping each other
6. trust: transparency and integrity of the administration
7. safety: disaster prevention, care, watching over residents
8. nature: natural environment, livability

### Overall rank
- S: population target met and turning to growth, well-being 85 or more
- A: population target met, well-being 70 or more
- B: 80% of the target met, well-being 55 or more
- C: some improvement, well-being 40 or more
- D: limited effect, well-being below 40

## Output
Answer with this JSON object only. Do not add any text outside the JSON:

{{
  "proposal": "policy proposal combining the four cards (about 400 characters)",
  "wellBeingScores": {{
    "economic": score 0-12.5 with one decimal,
    "socialConnection": number,
    "healthMedical": number,
    "autonomy": number,
    "generosity": number,
    "trust": number,
    "safety": number,
    "nature": number,
    "total": sum 0-100
  }},
  "populationSim": {{
    "withoutPolicy": {{ "y5": population after 5 years, "y10": after 10 years, "y20": after 20 years }},
    "withPolicy": {{ "y5": population after 5 years, "y10": after 10 years, "y20": after 20 years }}
  }},
  "rankJudge": {{
    "populationAchieved": true or false,
    "wellBeingAchieved": true or false,
    "populationDiff": difference from the target (positive = exceeded),
    "wellBeingDiff": difference from the target
  }},
  "rank": "S" or "A" or "B" or "C" or "D",
  "strengths": ["strength 1", "strength 2", "strength 3"],
  "challenges": ["challenge 1", "challenge 2", "challenge 3"],
  "nextActions": ["next action 1", "next action 2", "next action 3"],
  "comment": "overall comment (about 200 characters)"
}}"#,
            team = submission.team.name,
            members = submission.team.members.replace('\n', ", "),
            date = submission.submitted_on.format("%Y-%m-%d"),
            cards = cards,
            mean_wb = metrics.mean_well_being,
            mean_feas = metrics.mean_feasibility,
            residents = grouped(metrics.total_affected_residents as f64),
            months = metrics.longest_implementation_months,
            budget = metrics.total_budget_million_yen,
            plan = submission.text("plan_text"),
            target_pop = grouped(f64::from(metrics.target_population)),
            baseline = grouped(f64::from(metrics.baseline_population)),
            target_wb = metrics.target_well_being,
        )
    }

    fn system_prompt() -> &'static str {
        "You evaluate municipal policy proposals for a shrinking town. Return only a JSON object, without markdown code fences."
    }

    fn finalize_assessment(assessment: &mut PolicyAssessment) {
        let scores = &mut assessment.well_being_scores;
        let sum = scores.axis_sum();
        if (scores.total - sum).abs() > f64::EPSILON {
            tracing::debug!(reported = scores.total, computed = sum, "Well-being total recomputed");
        }
        scores.total = sum;
        if let Some(rank) = PolicyRank::parse(&assessment.rank) {
            assessment.rank = rank.as_str().to_string();
        }
    }

    fn headline(submission: &Submission<Self>) -> String {
        let first_line = submission.text("plan_text").lines().next().unwrap_or_default();
        let headline: String = first_line.chars().take(40).collect();
        if headline.chars().count() < first_line.chars().count() {
            format!("{headline}...")
        } else {
            headline
        }
    }

    fn headline_score(assessment: &PolicyAssessment) -> String {
        assessment
            .rank()
            .map(|r| r.as_str().to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}
