//! Prompt synthesis
//!
//! A [`Submission`] is the immutable snapshot the evaluator is asked about:
//! the final selection, the team's free text (trimmed, all required), the
//! template parameters, the team, and a caller-supplied date. Rendering is
//! deterministic; the same submission always yields the same bytes.

use crate::card::Card;
use crate::errors::{Result, ScenarioError};
use crate::selection::FinalSelection;
use crate::template::{Category, Template};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// Team
// ─────────────────────────────────────────────────────────────────────────────

/// Team identity captured when a session starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    /// Member names, newline separated as entered
    pub members: String,
}

impl Team {
    /// Both fields are required and stored trimmed
    pub fn new(name: impl AsRef<str>, members: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim();
        let members = members.as_ref().trim();
        if name.is_empty() {
            return Err(ScenarioError::validation("team name is required"));
        }
        if members.is_empty() {
            return Err(ScenarioError::validation("team members are required"));
        }
        Ok(Self {
            name: name.to_string(),
            members: members.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Submission
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the evaluator sees for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Submission<T: Template> {
    pub team: Team,
    pub selection: FinalSelection<T>,
    free_text: BTreeMap<String, String>,
    pub parameters: T::Parameters,
    pub submitted_on: NaiveDate,
}

impl<T: Template> Submission<T> {
    /// Validate and trim the free text; keys outside the template are dropped
    pub fn new(
        team: Team,
        selection: FinalSelection<T>,
        free_text: &BTreeMap<String, String>,
        parameters: T::Parameters,
        submitted_on: NaiveDate,
    ) -> Result<Self> {
        let free_text = validate_free_text::<T>(free_text)?;
        Ok(Self {
            team,
            selection,
            free_text,
            parameters,
            submitted_on,
        })
    }

    /// Trimmed value of a free-text field (empty for unknown keys)
    pub fn text(&self, key: &str) -> &str {
        self.free_text.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn free_text(&self) -> &BTreeMap<String, String> {
        &self.free_text
    }
}

/// Check every required field is non-empty after trimming
pub fn validate_free_text<T: Template>(
    free_text: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut trimmed = BTreeMap::new();
    for field in T::TEXT_FIELDS {
        let value = free_text.get(field.key).map(|v| v.trim()).unwrap_or_default();
        if value.is_empty() {
            return Err(ScenarioError::validation(format!("{} is required", field.label)));
        }
        trimmed.insert(field.key.to_string(), value.to_string());
    }
    Ok(trimmed)
}

/// Render the evaluation request for a submission
pub fn synthesize<T: Template>(submission: &Submission<T>, metrics: &T::Metrics) -> String {
    let prompt = T::render_prompt(submission, metrics);
    tracing::debug!(
        template = T::NAME,
        prompt_chars = prompt.chars().count(),
        "Prompt synthesized"
    );
    prompt
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatting helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Round to a whole number and group thousands (`1234567.4` → `1,234,567`)
pub fn grouped(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Yen amount with grouping (`¥1,200`)
pub fn yen(value: f64) -> String {
    if value < 0.0 {
        format!("-¥{}", grouped(-value))
    } else {
        format!("¥{}", grouped(value))
    }
}

/// Heading and identifying lines of one selected card
pub fn card_section<A>(category: &Category, card: &Card<A>) -> String {
    let mut out = format!(
        "### {} {} ({})\n- Card: {}\n- Details: {}\n",
        category.suit.symbol(),
        category.label,
        category.question,
        card.label(),
        card.description
    );
    if let Some(flavor) = card.flavor_text.as_deref().filter(|f| !f.trim().is_empty()) {
        let _ = writeln!(out, "- Flavor: {flavor}");
    }
    out
}
