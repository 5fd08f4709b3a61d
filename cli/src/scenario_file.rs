//! Scenario files
//!
//! One team's whole play, written as TOML:
//!
//! ```toml
//! game = "business"
//! team = "Falcons"
//! members = ["Ann", "Bo"]
//! date = "2025-04-01"          # defaults to today
//! growth_rate = 0.25           # business: regrow sales from year 1
//!
//! [cards]
//! persona = "students"
//! problem = "food-waste"
//! partner = "farmers"
//! job_type = "subscription"
//!
//! [text]
//! solution_name = "Snack Box"
//! user_benefit = "..."
//! advantage = "..."
//! plan_revision = "..."
//!
//! [[edits]]                    # business: single projection cells
//! year = 3
//! field = "monthly_sales"
//! value = 150
//!
//! [targets]                    # policy only
//! target_population = 12000
//! target_well_being = 75
//! ```

use crate::Game;
use anyhow::{Context, bail};
use cardquest_scenario::adapters::JsonCatalog;
use cardquest_scenario::template::policy::PolicyTargets;
use cardquest_scenario::{BusinessPlan, CardQuestConfig, Session, Team, Template, YearField};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub game: Game,
    pub team: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Card file overriding the configured catalog
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default)]
    pub growth_rate: Option<f64>,
    /// Card id per category key
    #[serde(default)]
    pub cards: BTreeMap<String, String>,
    #[serde(default)]
    pub text: BTreeMap<String, String>,
    #[serde(default)]
    pub edits: Vec<YearEdit>,
    #[serde(default)]
    pub targets: Option<Targets>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YearEdit {
    pub year: u8,
    pub field: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Targets {
    pub target_population: u32,
    pub target_well_being: u32,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn team(&self) -> cardquest_scenario::Result<Team> {
        Team::new(&self.team, self.members.join("\n"))
    }

    pub fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn catalog_path(&self, cfg: &CardQuestConfig) -> PathBuf {
        match (&self.catalog, self.game) {
            (Some(path), _) => path.clone(),
            (None, Game::Business) => cfg.resolved_business_catalog(),
            (None, Game::Policy) => cfg.resolved_policy_catalog(),
        }
    }

    pub fn policy_targets(&self) -> Option<PolicyTargets> {
        self.targets.map(|t| PolicyTargets {
            target_population: t.target_population,
            target_well_being: t.target_well_being,
        })
    }

    /// Start a session and walk the selection through the listed cards
    ///
    /// Categories without a card are left empty; the session is finalized
    /// only when all four are chosen.
    pub async fn open_session<T: Template>(
        &self,
        parameters: Option<T::Parameters>,
        cfg: CardQuestConfig,
    ) -> anyhow::Result<Session<T>> {
        if let Some(unknown) = self.cards.keys().find(|k| T::category_index(k).is_none()) {
            bail!("unknown category '{unknown}' for the {} game", T::NAME);
        }

        let catalog = JsonCatalog::new(self.catalog_path(&cfg));
        let mut session = Session::<T>::start(self.team()?, parameters, &catalog, cfg).await?;

        let mut chosen = 0;
        for (index, category) in T::CATEGORIES.iter().enumerate() {
            let Some(card_id) = self.cards.get(category.key) else {
                continue;
            };
            session.jump_to(index)?;
            session.select_card(category.key, card_id)?;
            if index + 1 < T::CATEGORIES.len() {
                session.advance()?;
            }
            chosen += 1;
        }

        if chosen == T::CATEGORIES.len() {
            session.finalize()?;
        }
        Ok(session)
    }

    /// Apply `growth_rate` and then each `[[edits]]` cell, in file order
    pub fn apply_projection_edits(&self, session: &mut Session<BusinessPlan>) -> anyhow::Result<()> {
        if self.growth_rate.is_none() && self.edits.is_empty() {
            return Ok(());
        }
        if session.final_selection().is_none() {
            bail!("projection edits need a card in every category");
        }

        if let Some(rate) = self.growth_rate {
            session.apply_growth_rate(rate)?;
        }
        for edit in &self.edits {
            let field = YearField::parse(&edit.field)
                .with_context(|| format!("unknown projection field '{}'", edit.field))?;
            session.edit_year(edit.year, field, edit.value)?;
        }
        Ok(())
    }
}
