//! External collaborators
//!
//! The pipeline only talks to the outside world through these traits. File
//! and HTTP implementations live in [`crate::adapters`]; tests provide mocks.

use crate::card::Card;
use crate::errors::Result;
use crate::template::Category;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest free-text value kept in a save summary
pub const SAVE_TEXT_LIMIT: usize = 2000;

// ─────────────────────────────────────────────────────────────────────────────
// Card Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only card source
#[async_trait]
pub trait CardCatalog<A>: Send + Sync {
    /// Cards of one category, ordered by rank ascending; empty is valid
    ///
    /// # Returns
    /// * `Err(ScenarioError::CatalogUnavailable)` - the source could not be read
    async fn fetch(&self, category: &Category) -> Result<Vec<Card<A>>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluator
// ─────────────────────────────────────────────────────────────────────────────

/// Text-in, text-out AI evaluation call
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Send one prompt and return the raw answer text
    ///
    /// # Returns
    /// * `Err(ScenarioError::AiServiceUnavailable)` - non-success status or transport failure
    async fn evaluate(&self, system_prompt: &str, prompt: &str) -> Result<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario Store
// ─────────────────────────────────────────────────────────────────────────────

/// Selected card shown in a save summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLabel {
    pub category: String,
    /// `"{rank} - {title}"`
    pub label: String,
}

/// Human-facing record of an evaluated scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    /// `"{team} - {headline} ({date})"`
    pub title: String,
    pub template: String,
    pub team_name: String,
    pub members: String,
    pub cards: Vec<CardLabel>,
    /// Free text, each value cut to [`SAVE_TEXT_LIMIT`] characters
    pub free_text: BTreeMap<String, String>,
    /// Business score or policy rank
    pub headline_score: String,
    pub submitted_on: NaiveDate,
}

/// Where a saved scenario ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub location_id: String,
    pub location_url: String,
}

/// Fire-and-forget persistence of evaluated scenarios
#[async_trait]
pub trait ScenarioStore: Send + Sync {
    /// Persist one summary together with the full evaluation
    ///
    /// # Returns
    /// * `Err(ScenarioError::PersistenceFailed)` - nothing was saved
    async fn save(
        &self,
        summary: &SaveSummary,
        evaluation: &serde_json::Value,
    ) -> Result<SaveReceipt>;
}

/// Cut `text` to at most `limit` characters
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
