//! Card selection state machine
//!
//! Walks the four categories of a [`Template`] in order, holding at most one
//! card per category. The catalog is fetched once, sequentially, before the
//! machine is usable and is read-only afterwards.

use crate::card::Card;
use crate::collaborators::CardCatalog;
use crate::errors::{Result, ScenarioError};
use crate::template::{Category, Template};
use serde::{Deserialize, Serialize};

/// Number of categories every template defines
pub const CATEGORY_COUNT: usize = 4;

/// Position of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum SelectionState {
    /// Choosing the card for the category at this index
    Selecting(usize),
    /// Every category reviewed and finalized
    Complete,
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Cards available per category, in template order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Catalog<T: Template> {
    cards: [Vec<Card<T::Attributes>>; CATEGORY_COUNT],
}

impl<T: Template> Catalog<T> {
    /// Fetch all four categories one after another; any failure aborts the load
    pub async fn load(source: &dyn CardCatalog<T::Attributes>) -> Result<Self> {
        let mut cards: [Vec<Card<T::Attributes>>; CATEGORY_COUNT] = Default::default();

        for (slot, category) in cards.iter_mut().zip(T::CATEGORIES) {
            let fetched = source.fetch(&category).await.map_err(|e| {
                tracing::warn!(
                    template = T::NAME,
                    category = category.key,
                    error = %e,
                    "Card catalog fetch failed"
                );
                match e {
                    ScenarioError::CatalogUnavailable { .. } => e,
                    other => ScenarioError::catalog_with_source(
                        format!("fetching {} cards failed", category.key),
                        other,
                    ),
                }
            })?;
            tracing::debug!(category = category.key, count = fetched.len(), "Cards fetched");
            *slot = fetched;
        }

        Ok(Self { cards })
    }

    /// Build a catalog from already-fetched cards (index = category index)
    pub fn from_cards(cards: [Vec<Card<T::Attributes>>; CATEGORY_COUNT]) -> Self {
        Self { cards }
    }

    /// Cards of one category; empty for an unknown index
    pub fn cards(&self, index: usize) -> &[Card<T::Attributes>] {
        self.cards.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Find a card by id within one category
    pub fn find(&self, index: usize, card_id: &str) -> Option<&Card<T::Attributes>> {
        self.cards(index).iter().find(|c| c.id == card_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selection machine
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered selection over the template's categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SelectionMachine<T: Template> {
    state: SelectionState,
    selected: [Option<Card<T::Attributes>>; CATEGORY_COUNT],
}

impl<T: Template> Default for SelectionMachine<T> {
    fn default() -> Self {
        Self {
            state: SelectionState::Selecting(0),
            selected: Default::default(),
        }
    }
}

impl<T: Template> SelectionMachine<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Category the machine currently points at (`None` once complete)
    pub fn current_category(&self) -> Option<Category> {
        match self.state {
            SelectionState::Selecting(i) => T::CATEGORIES.get(i).copied(),
            SelectionState::Complete => None,
        }
    }

    /// Card chosen for a category, if any
    pub fn selected(&self, index: usize) -> Option<&Card<T::Attributes>> {
        self.selected.get(index).and_then(Option::as_ref)
    }

    /// Set or overwrite the card of one category; the position does not move
    pub fn select_card(&mut self, index: usize, card: Card<T::Attributes>) -> Result<()> {
        let slot = self
            .selected
            .get_mut(index)
            .ok_or_else(|| invalid_index::<T>(index))?;
        let category = T::CATEGORIES[index];
        tracing::debug!(category = category.key, card_id = %card.id, "Card selected");
        *slot = Some(card);
        Ok(())
    }

    /// Move to the next category; the current one must have a card, and
    /// leaving the last category needs every category filled
    pub fn advance(&mut self) -> Result<SelectionState> {
        let SelectionState::Selecting(i) = self.state else {
            return Ok(self.state);
        };

        let Some(category) = T::CATEGORIES.get(i).copied() else {
            return Err(invalid_index::<T>(i));
        };
        if self.selected(i).is_none() {
            return Err(ScenarioError::incomplete_selection([category.key]));
        }

        self.state = if i + 1 >= CATEGORY_COUNT {
            if !self.is_filled() {
                return Err(ScenarioError::incomplete_selection(self.missing()));
            }
            SelectionState::Complete
        } else {
            SelectionState::Selecting(i + 1)
        };
        Ok(self.state)
    }

    /// Move back one category; stays put at the first
    pub fn retreat(&mut self) -> SelectionState {
        self.state = match self.state {
            SelectionState::Selecting(i) => SelectionState::Selecting(i.saturating_sub(1)),
            SelectionState::Complete => SelectionState::Selecting(CATEGORY_COUNT - 1),
        };
        self.state
    }

    /// Jump to any category for review
    pub fn jump_to(&mut self, index: usize) -> Result<SelectionState> {
        if index >= CATEGORY_COUNT {
            return Err(invalid_index::<T>(index));
        }
        self.state = SelectionState::Selecting(index);
        Ok(self.state)
    }

    /// Leave `Complete` to edit one category again; no-op while selecting
    pub fn reopen(&mut self, index: usize) -> Result<SelectionState> {
        if index >= CATEGORY_COUNT {
            return Err(invalid_index::<T>(index));
        }
        if self.state == SelectionState::Complete {
            self.state = SelectionState::Selecting(index);
        }
        Ok(self.state)
    }

    /// Keys of categories without a card, in template order
    pub fn missing(&self) -> Vec<&'static str> {
        T::CATEGORIES
            .iter()
            .zip(self.selected.iter())
            .filter(|(_, card)| card.is_none())
            .map(|(category, _)| category.key)
            .collect()
    }

    pub fn is_filled(&self) -> bool {
        self.selected.iter().all(Option::is_some)
    }

    /// Freeze the selection; every category must have a card
    pub fn finalize(&mut self) -> Result<FinalSelection<T>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ScenarioError::incomplete_selection(missing));
        }

        let [Some(a), Some(b), Some(c), Some(d)] = self.selected.clone() else {
            return Err(ScenarioError::incomplete_selection(self.missing()));
        };

        self.state = SelectionState::Complete;
        tracing::info!(template = T::NAME, "Selection finalized");
        Ok(FinalSelection { cards: [a, b, c, d] })
    }
}

fn invalid_index<T: Template>(index: usize) -> ScenarioError {
    ScenarioError::validation(format!(
        "category index {index} is out of range for the {} game (0..={})",
        T::NAME,
        CATEGORY_COUNT - 1
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Final selection
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable, complete selection: exactly one card per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct FinalSelection<T: Template> {
    cards: [Card<T::Attributes>; CATEGORY_COUNT],
}

impl<T: Template> FinalSelection<T> {
    /// Card of the category at `index` (template order)
    pub fn card(&self, index: usize) -> Option<&Card<T::Attributes>> {
        self.cards.get(index)
    }

    /// All four cards, in template order
    pub fn cards(&self) -> &[Card<T::Attributes>; CATEGORY_COUNT] {
        &self.cards
    }

    /// Card of the category with this key
    pub fn by_key(&self, key: &str) -> Option<&Card<T::Attributes>> {
        T::category_index(key).map(|i| &self.cards[i])
    }

    /// Categories paired with their cards, in template order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Card<T::Attributes>)> {
        T::CATEGORIES.into_iter().zip(self.cards.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;
    use crate::errors::ErrorCategory;
    use crate::template::BusinessPlan;
    use crate::template::business::BusinessAttributes;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn card(id: &str, suit: Suit) -> Card<BusinessAttributes> {
        Card {
            id: id.to_string(),
            suit,
            rank: "A".to_string(),
            title: format!("title {id}"),
            description: String::new(),
            flavor_text: None,
            card_name: String::new(),
            attributes: BusinessAttributes::default(),
        }
    }

    fn filled() -> SelectionMachine<BusinessPlan> {
        let mut machine = SelectionMachine::<BusinessPlan>::new();
        for (i, category) in BusinessPlan::CATEGORIES.iter().enumerate() {
            machine
                .select_card(i, card(category.key, category.suit))
                .expect("select");
        }
        machine
    }

    #[test]
    fn test_advance_requires_current_selection() {
        let mut machine = SelectionMachine::<BusinessPlan>::new();
        let err = machine.advance().expect_err("must reject");
        assert_eq!(err.category(), ErrorCategory::IncompleteSelection);
        assert_eq!(machine.state(), SelectionState::Selecting(0));

        machine.select_card(0, card("p", Suit::Heart)).expect("select");
        assert_eq!(machine.advance().expect("advance"), SelectionState::Selecting(1));
    }

    #[test]
    fn test_walk_to_complete_and_back() {
        let mut machine = filled();
        for expected in [1, 2, 3] {
            assert_eq!(machine.advance().expect("advance"), SelectionState::Selecting(expected));
        }
        assert_eq!(machine.advance().expect("advance"), SelectionState::Complete);
        // no-op once complete
        assert_eq!(machine.advance().expect("advance"), SelectionState::Complete);
        assert_eq!(machine.retreat(), SelectionState::Selecting(3));
        assert_eq!(machine.jump_to(0).expect("jump"), SelectionState::Selecting(0));
        assert_eq!(machine.retreat(), SelectionState::Selecting(0));
    }

    #[test]
    fn test_advance_past_last_requires_all_categories() {
        let mut machine = SelectionMachine::<BusinessPlan>::new();
        machine.jump_to(3).expect("jump");
        machine.select_card(3, card("j", Suit::Spade)).expect("select");

        match machine.advance() {
            Err(ScenarioError::IncompleteSelection { missing }) => {
                assert_eq!(missing, vec!["persona", "problem", "partner"]);
            }
            other => panic!("expected IncompleteSelection, got {other:?}"),
        }
        assert_eq!(machine.state(), SelectionState::Selecting(3));
    }

    #[test]
    fn test_reopen_leaves_complete_only() {
        let mut machine = filled();
        machine.finalize().expect("finalize");
        assert_eq!(machine.reopen(1).expect("reopen"), SelectionState::Selecting(1));
        // already selecting: position is kept
        assert_eq!(machine.reopen(3).expect("reopen"), SelectionState::Selecting(1));
        assert!(machine.reopen(4).is_err());
    }

    #[test]
    fn test_select_does_not_move_and_overwrites() {
        let mut machine = SelectionMachine::<BusinessPlan>::new();
        machine.jump_to(2).expect("jump");
        machine.select_card(2, card("first", Suit::Club)).expect("select");
        machine.select_card(2, card("second", Suit::Club)).expect("select");
        assert_eq!(machine.state(), SelectionState::Selecting(2));
        assert_eq!(machine.selected(2).map(|c| c.id.as_str()), Some("second"));
        assert!(machine.select_card(4, card("x", Suit::Club)).is_err());
    }

    #[test]
    fn test_jump_out_of_range() {
        let mut machine = SelectionMachine::<BusinessPlan>::new();
        let err = machine.jump_to(4).expect_err("out of range");
        assert_eq!(err.category(), ErrorCategory::ValidationError);
    }

    #[test]
    fn test_finalize_names_missing_categories() {
        let mut machine = SelectionMachine::<BusinessPlan>::new();
        machine.select_card(0, card("p", Suit::Heart)).expect("select");
        machine.select_card(2, card("c", Suit::Club)).expect("select");

        match machine.finalize() {
            Err(ScenarioError::IncompleteSelection { missing }) => {
                assert_eq!(missing, vec!["problem".to_string(), "job_type".to_string()]);
            }
            other => panic!("expected IncompleteSelection, got {other:?}"),
        }
        assert_eq!(machine.state(), SelectionState::Selecting(0));
    }

    #[test]
    fn test_finalize_complete_selection() {
        let mut machine = filled();
        let selection = machine.finalize().expect("finalize");
        assert_eq!(machine.state(), SelectionState::Complete);
        assert_eq!(selection.card(1).map(|c| c.id.as_str()), Some("problem"));
        assert!(selection.card(CATEGORY_COUNT).is_none());
        assert_eq!(selection.cards()[3].id, "job_type");
        assert_eq!(selection.by_key("partner").map(|c| c.id.as_str()), Some("partner"));
        let keys: Vec<&str> = selection.iter().map(|(c, _)| c.key).collect();
        assert_eq!(keys, vec!["persona", "problem", "partner", "job_type"]);
    }

    struct RecordingCatalog {
        calls: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl CardCatalog<BusinessAttributes> for RecordingCatalog {
        async fn fetch(&self, category: &Category) -> Result<Vec<Card<BusinessAttributes>>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(category.key);
            }
            if self.fail_on == Some(category.key) {
                return Err(ScenarioError::ai_service("upstream 503"));
            }
            Ok(vec![card(category.key, category.suit)])
        }
    }

    #[tokio::test]
    async fn test_catalog_loads_in_order() {
        let source = RecordingCatalog {
            calls: Mutex::new(Vec::new()),
            fail_on: None,
        };
        let catalog = Catalog::<BusinessPlan>::load(&source).await.expect("load");
        assert_eq!(catalog.cards(3).len(), 1);
        assert!(catalog.find(0, "persona").is_some());
        assert!(catalog.cards(9).is_empty());
        let calls = source.calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(calls, vec!["persona", "problem", "partner", "job_type"]);
    }

    #[tokio::test]
    async fn test_catalog_failure_aborts_whole_load() {
        let source = RecordingCatalog {
            calls: Mutex::new(Vec::new()),
            fail_on: Some("problem"),
        };
        let err = Catalog::<BusinessPlan>::load(&source)
            .await
            .expect_err("must fail");
        assert_eq!(err.category(), ErrorCategory::CatalogError);
        assert!(err.is_retryable());
        let calls = source.calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(calls, vec!["persona", "problem"]);
    }
}
