//! Scenario session
//!
//! A [`Session`] owns everything one team produces on one device: the catalog
//! snapshot, the selection machine, the tuned parameters, the latest
//! evaluation and the latest save receipt. It serializes to JSON so a caller
//! can snapshot it between steps.
//!
//! `submit` and `save` borrow the session exclusively, so at most one
//! evaluation is in flight per session. A failed submit keeps the previous
//! evaluation; a failed save keeps the evaluation.

use crate::card::Card;
use crate::collaborators::{
    CardCatalog, CardLabel, Evaluator, SAVE_TEXT_LIMIT, SaveReceipt, SaveSummary, ScenarioStore,
    truncate_chars,
};
use crate::config::CardQuestConfig;
use crate::errors::{Result, ScenarioError};
use crate::normalize::{EvaluationResult, normalize};
use crate::projection::{self, YearField, YearParameter, YearResult};
use crate::prompt::{Submission, Team, synthesize};
use crate::selection::{Catalog, FinalSelection, SelectionMachine, SelectionState};
use crate::template::{BusinessPlan, Category, Template};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One team's pass through a scenario game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Session<T: Template> {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub team: Team,
    catalog: Catalog<T>,
    selection: SelectionMachine<T>,
    #[serde(default)]
    final_selection: Option<FinalSelection<T>>,
    parameters: T::Parameters,
    #[serde(default)]
    submission: Option<Submission<T>>,
    #[serde(default)]
    evaluation: Option<EvaluationResult<T>>,
    #[serde(default)]
    receipt: Option<SaveReceipt>,
    #[serde(skip)]
    cfg: CardQuestConfig,
}

impl<T: Template> Session<T> {
    /// Validate the team's parameters, then fetch the catalog
    pub async fn start(
        team: Team,
        parameters: Option<T::Parameters>,
        source: &dyn CardCatalog<T::Attributes>,
        cfg: CardQuestConfig,
    ) -> Result<Self> {
        let parameters = parameters.unwrap_or_else(|| T::default_parameters(&cfg));
        T::validate_parameters(&parameters, &cfg)?;
        let catalog = Catalog::load(source).await?;
        Self::new(team, Some(parameters), catalog, cfg)
    }

    /// Build a session around an already-loaded catalog
    pub fn new(
        team: Team,
        parameters: Option<T::Parameters>,
        catalog: Catalog<T>,
        cfg: CardQuestConfig,
    ) -> Result<Self> {
        let parameters = parameters.unwrap_or_else(|| T::default_parameters(&cfg));
        T::validate_parameters(&parameters, &cfg)?;

        let session = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            team,
            catalog,
            selection: SelectionMachine::new(),
            final_selection: None,
            parameters,
            submission: None,
            evaluation: None,
            receipt: None,
            cfg,
        };
        tracing::info!(
            session_id = %session.id,
            template = T::NAME,
            team = %session.team.name,
            "Session started"
        );
        Ok(session)
    }

    /// Re-attach configuration after loading a snapshot
    pub fn with_config(mut self, cfg: CardQuestConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn config(&self) -> &CardQuestConfig {
        &self.cfg
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn catalog(&self) -> &Catalog<T> {
        &self.catalog
    }

    pub fn current_category(&self) -> Option<Category> {
        self.selection.current_category()
    }

    /// Card currently chosen for a category key
    pub fn selected(&self, category_key: &str) -> Option<&Card<T::Attributes>> {
        T::category_index(category_key).and_then(|i| self.selection.selected(i))
    }

    /// Choose a catalog card for a category; overwrites any earlier choice
    pub fn select_card(&mut self, category_key: &str, card_id: &str) -> Result<()> {
        let index = T::category_index(category_key).ok_or_else(|| {
            ScenarioError::validation(format!(
                "unknown category '{category_key}' for the {} game",
                T::NAME
            ))
        })?;
        let card = self.catalog.find(index, card_id).cloned().ok_or_else(|| {
            ScenarioError::validation(format!(
                "card '{card_id}' is not in the {category_key} catalog"
            ))
        })?;

        self.selection.select_card(index, card)?;
        if self.final_selection.take().is_some() {
            self.selection.reopen(index)?;
            tracing::info!(category = category_key, "Selection reopened");
        }
        Ok(())
    }

    pub fn advance(&mut self) -> Result<SelectionState> {
        self.selection.advance()
    }

    pub fn retreat(&mut self) -> SelectionState {
        self.selection.retreat()
    }

    pub fn jump_to(&mut self, index: usize) -> Result<SelectionState> {
        self.selection.jump_to(index)
    }

    /// Freeze the selection and seed card-dependent parameters
    pub fn finalize(&mut self) -> Result<&FinalSelection<T>> {
        let selection = self.selection.finalize()?;
        T::prepare_parameters(&mut self.parameters, &selection, &self.cfg);
        Ok(&*self.final_selection.insert(selection))
    }

    pub fn final_selection(&self) -> Option<&FinalSelection<T>> {
        self.final_selection.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parameters and metrics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn parameters(&self) -> &T::Parameters {
        &self.parameters
    }

    /// Replace the parameters after validating them
    pub fn set_parameters(&mut self, parameters: T::Parameters) -> Result<()> {
        T::validate_parameters(&parameters, &self.cfg)?;
        self.parameters = parameters;
        Ok(())
    }

    /// Metrics for the finalized selection and current parameters
    pub fn metrics(&self) -> Result<T::Metrics> {
        let selection = self.require_final()?;
        Ok(T::compute_metrics(selection, &self.parameters, &self.cfg))
    }

    fn require_final(&self) -> Result<&FinalSelection<T>> {
        if let Some(selection) = &self.final_selection {
            return Ok(selection);
        }
        let missing = self.selection.missing();
        if missing.is_empty() {
            Err(ScenarioError::validation("the selection has not been finalized"))
        } else {
            Err(ScenarioError::incomplete_selection(missing))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Evaluation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate, render, evaluate and normalize one submission
    ///
    /// Validation (selection, free text, parameters) happens before the
    /// evaluator is called. On any failure the previous evaluation stays.
    pub async fn submit(
        &mut self,
        free_text: &BTreeMap<String, String>,
        evaluator: &dyn Evaluator,
        today: NaiveDate,
    ) -> Result<&EvaluationResult<T>> {
        if self.final_selection.is_none() {
            self.finalize()?;
        }
        let selection = self.require_final()?.clone();
        T::validate_parameters(&self.parameters, &self.cfg)?;
        let submission = Submission::new(
            self.team.clone(),
            selection,
            free_text,
            self.parameters.clone(),
            today,
        )?;

        let metrics = T::compute_metrics(&submission.selection, &submission.parameters, &self.cfg);
        let prompt = synthesize(&submission, &metrics);

        tracing::info!(session_id = %self.id, template = T::NAME, "Submitting for evaluation");
        let raw = evaluator
            .evaluate(T::system_prompt(), &prompt)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    session_id = %self.id,
                    category = e.category().as_str(),
                    error = %e,
                    "Evaluation call failed"
                );
            })?;

        let result = normalize::<T>(&raw, metrics, self.cfg.normalizer.preview_chars)?;

        self.submission = Some(submission);
        self.receipt = None;
        Ok(&*self.evaluation.insert(result))
    }

    pub fn evaluation(&self) -> Option<&EvaluationResult<T>> {
        self.evaluation.as_ref()
    }

    pub fn submission(&self) -> Option<&Submission<T>> {
        self.submission.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Save
    // ─────────────────────────────────────────────────────────────────────────

    /// Summary of the latest evaluation for the save collaborator
    pub fn save_summary(&self) -> Result<SaveSummary> {
        let (Some(submission), Some(evaluation)) = (&self.submission, &self.evaluation) else {
            return Err(ScenarioError::validation("there is no evaluation to save yet"));
        };

        let date = submission.submitted_on.format("%Y/%m/%d");
        Ok(SaveSummary {
            title: format!("{} - {} ({date})", self.team.name, T::headline(submission)),
            template: T::NAME.to_string(),
            team_name: self.team.name.clone(),
            members: self.team.members.clone(),
            cards: submission
                .selection
                .iter()
                .map(|(category, card)| CardLabel {
                    category: category.key.to_string(),
                    label: card.label(),
                })
                .collect(),
            free_text: submission
                .free_text()
                .iter()
                .map(|(k, v)| (k.clone(), truncate_chars(v, SAVE_TEXT_LIMIT)))
                .collect(),
            headline_score: T::headline_score(&evaluation.assessment),
            submitted_on: submission.submitted_on,
        })
    }

    /// Persist the latest evaluation; a failure leaves the evaluation in place
    pub async fn save(&mut self, store: &dyn ScenarioStore) -> Result<&SaveReceipt> {
        let summary = self.save_summary()?;
        let evaluation = serde_json::to_value(&self.evaluation)
            .map_err(|e| ScenarioError::persistence_with_source("encoding evaluation failed", e))?;

        let receipt = store.save(&summary, &evaluation).await.inspect_err(|e| {
            tracing::warn!(session_id = %self.id, error = %e, "Save failed");
        })?;

        tracing::info!(
            session_id = %self.id,
            location_id = %receipt.location_id,
            "Scenario saved"
        );
        Ok(&*self.receipt.insert(receipt))
    }

    pub fn receipt(&self) -> Option<&SaveReceipt> {
        self.receipt.as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Business projection editing
// ─────────────────────────────────────────────────────────────────────────────

impl Session<BusinessPlan> {
    /// Current 5-year table
    pub fn projection(&self) -> Vec<YearResult> {
        projection::compute_years(&self.parameters.years)
    }

    /// Replace all year parameters and return the recomputed table
    pub fn recompute_projection(&mut self, years: Vec<YearParameter>) -> Result<Vec<YearResult>> {
        if let Some(bad) = years.iter().find(|y| {
            !(y.unit_price.is_finite() && y.unit_price >= 0.0)
                || !(y.variable_cost_per_unit.is_finite() && y.variable_cost_per_unit >= 0.0)
        }) {
            return Err(ScenarioError::validation(format!(
                "year {}: price and cost must be non-negative numbers",
                bad.year
            )));
        }
        self.parameters.years = years;
        Ok(self.projection())
    }

    /// Change one cell of the table
    pub fn edit_year(&mut self, year: u8, field: YearField, value: f64) -> Result<Vec<YearResult>> {
        projection::edit_year(&mut self.parameters.years, year, field, value)?;
        Ok(self.projection())
    }

    /// Regrow every year's sales from year 1 at `rate`
    pub fn apply_growth_rate(&mut self, rate: f64) -> Result<Vec<YearResult>> {
        if !rate.is_finite() || rate <= -1.0 {
            return Err(ScenarioError::validation("growth rate must be greater than -100%"));
        }
        self.parameters.years = projection::apply_growth_rate(&self.parameters.years, rate);
        Ok(self.projection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;
    use crate::errors::ErrorCategory;
    use crate::template::business::BusinessAttributes;
    use async_trait::async_trait;

    fn catalog() -> Catalog<BusinessPlan> {
        let cards = BusinessPlan::CATEGORIES.map(|category| {
            vec![Card {
                id: format!("{}-a", category.key),
                suit: category.suit,
                rank: "A".to_string(),
                title: format!("{} ace", category.key),
                description: String::new(),
                flavor_text: None,
                card_name: String::new(),
                attributes: BusinessAttributes {
                    monthly_sales: 100,
                    unit_price: 5_000.0,
                    variable_cost: 1_000.0,
                    ..Default::default()
                },
            }]
        });
        Catalog::from_cards(cards)
    }

    fn session() -> Session<BusinessPlan> {
        Session::new(
            Team::new("Falcons", "Ann").expect("team"),
            None,
            catalog(),
            CardQuestConfig::default(),
        )
        .expect("session")
    }

    fn select_all(session: &mut Session<BusinessPlan>) {
        for category in BusinessPlan::CATEGORIES {
            session
                .select_card(category.key, &format!("{}-a", category.key))
                .expect("select");
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Evaluator for Unreachable {
        async fn evaluate(&self, _system: &str, _prompt: &str) -> Result<String> {
            panic!("evaluator must not be called");
        }
    }

    #[test]
    fn test_select_unknown_card_rejected() {
        let mut session = session();
        assert!(session.select_card("persona", "missing").is_err());
        assert!(session.select_card("weather", "persona-a").is_err());
        assert_eq!(session.state(), SelectionState::Selecting(0));
        assert_eq!(session.current_category().map(|c| c.suit), Some(Suit::Heart));
    }

    #[test]
    fn test_finalize_seeds_projection() {
        let mut session = session();
        select_all(&mut session);
        session.finalize().expect("finalize");
        assert_eq!(session.state(), SelectionState::Complete);

        let table = session.projection();
        assert_eq!(table.len(), 5);
        assert_eq!(table[0].annual_revenue, 6_000_000.0);

        let table = session
            .edit_year(2, YearField::UnitPrice, 6_000.0)
            .expect("edit");
        assert_eq!(table[1].unit_price, 6_000.0);
        assert_eq!(table[2].unit_price, 5_000.0);

        let table = session.apply_growth_rate(0.0).expect("regrow");
        assert!(table.iter().all(|y| y.monthly_sales == 100));
        assert!(session.apply_growth_rate(-1.0).is_err());
    }

    #[test]
    fn test_reselect_after_finalize_reopens_category() {
        let mut session = session();
        select_all(&mut session);
        session.finalize().expect("finalize");
        assert!(session.metrics().is_ok());

        session.select_card("problem", "problem-a").expect("reselect");
        assert_eq!(session.state(), SelectionState::Selecting(1));
        assert!(session.final_selection().is_none());
        assert!(session.metrics().is_err());

        session.finalize().expect("finalize again");
        assert_eq!(session.state(), SelectionState::Complete);
        assert!(session.metrics().is_ok());
    }

    #[test]
    fn test_recompute_projection_validates() {
        let mut session = session();
        let bad = vec![YearParameter {
            year: 1,
            monthly_sales: 1,
            unit_price: -3.0,
            variable_cost_per_unit: 0.0,
        }];
        assert!(session.recompute_projection(bad).is_err());

        let good = projection::initialize_years(100, 5_000.0, 1_000.0, 0.2, 2);
        let table = session.recompute_projection(good).expect("recompute");
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].profit_margin, 80);
    }

    #[tokio::test]
    async fn test_submit_rejects_incomplete_selection_before_calling() {
        let mut session = session();
        session.select_card("persona", "persona-a").expect("select");
        let err = session
            .submit(&BTreeMap::new(), &Unreachable, Utc::now().date_naive())
            .await
            .expect_err("incomplete");
        assert_eq!(err.category(), ErrorCategory::IncompleteSelection);
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_text_before_calling() {
        let mut session = session();
        select_all(&mut session);
        let mut text = BTreeMap::new();
        text.insert("solution_name".to_string(), "   ".to_string());
        let err = session
            .submit(&text, &Unreachable, Utc::now().date_naive())
            .await
            .expect_err("blank");
        assert_eq!(err.category(), ErrorCategory::ValidationError);
        assert!(session.evaluation().is_none());
    }

    #[test]
    fn test_save_summary_requires_evaluation() {
        let session = session();
        assert!(session.save_summary().is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = session();
        select_all(&mut session);
        session.finalize().expect("finalize");

        let json = serde_json::to_string(&session).expect("serialize");
        let restored: Session<BusinessPlan> = serde_json::from_str(&json).expect("deserialize");
        let restored = restored.with_config(CardQuestConfig::default());
        assert_eq!(restored.id, session.id);
        assert_eq!(restored.state(), SelectionState::Complete);
        assert_eq!(restored.projection(), session.projection());
        assert!(restored.metrics().is_ok());
    }
}
