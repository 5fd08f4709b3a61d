//! Scenario templates
//!
//! A [`Template`] describes one card game: its four categories, the numeric
//! attributes on its cards, the free-text fields a team fills in, the
//! parameters the team may tune, the metrics computed locally, the prompt
//! sent to the evaluator, and the shape of the evaluator's answer. The
//! pipeline (selection, projection, prompt, normalize, session) is generic
//! over it.

pub mod business;
pub mod policy;

pub use business::BusinessPlan;
pub use policy::PolicyPlan;

use crate::card::Suit;
use crate::config::CardQuestConfig;
use crate::errors::Result;
use crate::prompt::Submission;
use crate::selection::FinalSelection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// One of the four scenario dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// Stable key used in files and error messages (`persona`, `problem`, ...)
    pub key: &'static str,
    pub suit: Suit,
    /// Human label shown to participants
    pub label: &'static str,
    /// Question the category answers, used as a prompt subheading
    pub question: &'static str,
}

/// A required free-text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextField {
    pub key: &'static str,
    pub label: &'static str,
}

/// Descriptor of one scenario game
pub trait Template: Debug + Clone + Copy + Default + Send + Sync + 'static {
    /// Machine name (`business`, `policy`)
    const NAME: &'static str;

    /// Categories in display order
    const CATEGORIES: [Category; 4];

    /// Free-text fields, all required
    const TEXT_FIELDS: &'static [TextField];

    /// Numeric attributes carried by this game's cards
    type Attributes: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Team-tunable parameters
    type Parameters: Serialize
        + DeserializeOwned
        + Clone
        + Debug
        + PartialEq
        + Default
        + Send
        + Sync
        + 'static;

    /// Locally computed figures, trusted over anything the evaluator echoes
    type Metrics: Serialize
        + DeserializeOwned
        + Clone
        + Debug
        + PartialEq
        + Default
        + Send
        + Sync
        + 'static;

    /// Evaluator answer; every field tolerates absence
    type Assessment: Serialize
        + DeserializeOwned
        + Clone
        + Debug
        + PartialEq
        + Default
        + Send
        + Sync
        + 'static;

    /// Parameters a new session starts with
    fn default_parameters(cfg: &CardQuestConfig) -> Self::Parameters;

    /// Reject out-of-range parameters
    fn validate_parameters(_params: &Self::Parameters, _cfg: &CardQuestConfig) -> Result<()> {
        Ok(())
    }

    /// Seed parameters that depend on the chosen cards; existing edits are kept
    fn prepare_parameters(
        _params: &mut Self::Parameters,
        _selection: &FinalSelection<Self>,
        _cfg: &CardQuestConfig,
    ) {
    }

    /// Compute the trusted metrics for a selection and parameter set
    fn compute_metrics(
        selection: &FinalSelection<Self>,
        params: &Self::Parameters,
        cfg: &CardQuestConfig,
    ) -> Self::Metrics;

    /// Render the full evaluation request
    fn render_prompt(submission: &Submission<Self>, metrics: &Self::Metrics) -> String;

    /// System message sent alongside the prompt
    fn system_prompt() -> &'static str;

    /// Recompute fields of the answer that are plain arithmetic
    fn finalize_assessment(_assessment: &mut Self::Assessment) {}

    /// Short name of the scenario used in save titles
    fn headline(submission: &Submission<Self>) -> String;

    /// Score or rank shown in save summaries
    fn headline_score(assessment: &Self::Assessment) -> String;

    /// Look up a category index by key
    fn category_index(key: &str) -> Option<usize> {
        Self::CATEGORIES
            .iter()
            .position(|c| c.key.eq_ignore_ascii_case(key.trim()))
    }

    /// Look up a category index by suit
    fn category_for_suit(suit: Suit) -> Option<usize> {
        Self::CATEGORIES.iter().position(|c| c.suit == suit)
    }
}
