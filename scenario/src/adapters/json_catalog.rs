//! Card catalog backed by a JSON file
//!
//! Accepts either a bare array of cards or `{"cards": [...]}`. The file is
//! read on every fetch; cards are filtered by the category's suit and sorted
//! by rank (A first, K last).

use crate::card::Card;
use crate::collaborators::CardCatalog;
use crate::errors::{Result, ScenarioError};
use crate::template::Category;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile<A> {
    Wrapped { cards: Vec<Card<A>> },
    Bare(Vec<Card<A>>),
}

impl<A> CatalogFile<A> {
    fn into_cards(self) -> Vec<Card<A>> {
        match self {
            Self::Wrapped { cards } | Self::Bare(cards) => cards,
        }
    }
}

/// File-backed [`CardCatalog`]
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every card in the file, unfiltered
    pub async fn load_all<A: DeserializeOwned>(&self) -> Result<Vec<Card<A>>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ScenarioError::catalog_with_source(
                format!("failed to read {}", self.path.display()),
                e,
            )
        })?;

        let file: CatalogFile<A> = serde_json::from_str(&contents).map_err(|e| {
            ScenarioError::catalog_with_source(
                format!("failed to parse {}", self.path.display()),
                e,
            )
        })?;
        Ok(file.into_cards())
    }
}

#[async_trait]
impl<A> CardCatalog<A> for JsonCatalog
where
    A: DeserializeOwned + Send + Sync + 'static,
{
    async fn fetch(&self, category: &Category) -> Result<Vec<Card<A>>> {
        let mut cards: Vec<Card<A>> = self
            .load_all::<A>()
            .await?
            .into_iter()
            .filter(|card| card.suit == category.suit)
            .collect();
        cards.sort_by_key(Card::rank_ordinal);

        tracing::debug!(
            path = %self.path.display(),
            category = category.key,
            count = cards.len(),
            "Loaded cards from file"
        );
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use crate::template::business::BusinessAttributes;
    use crate::template::{BusinessPlan, Template};

    const CARDS: &str = r#"{"cards": [
        {"id": "h-k", "suit": "♥️ハート", "rank": "K", "title": "Seniors", "monthlySales": 40},
        {"id": "d-a", "suit": "diamond", "rank": "A", "title": "Loneliness", "unitPrice": "3000"},
        {"id": "h-a", "suit": "heart", "rank": "A", "title": "Students", "monthlySales": null},
        {"id": "h-7", "suit": "heart", "rank": "7", "title": "Parents"}
    ]}"#;

    #[tokio::test]
    async fn test_fetch_filters_and_sorts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("business.json");
        std::fs::write(&path, CARDS).expect("write");

        let catalog = JsonCatalog::new(&path);
        let persona = BusinessPlan::CATEGORIES[0];
        let cards: Vec<Card<BusinessAttributes>> = catalog.fetch(&persona).await.expect("fetch");

        let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["h-a", "h-7", "h-k"]);
        assert_eq!(cards[0].attributes.monthly_sales, 0);
        assert_eq!(cards[2].attributes.monthly_sales, 40);

        let problem = BusinessPlan::CATEGORIES[1];
        let cards: Vec<Card<BusinessAttributes>> = catalog.fetch(&problem).await.expect("fetch");
        assert_eq!(cards[0].attributes.unit_price, 3_000.0);
    }

    #[tokio::test]
    async fn test_bare_array_and_empty_category() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cards.json");
        std::fs::write(&path, r#"[{"id":"c-2","suit":"club","rank":"2","title":"NPO"}]"#)
            .expect("write");

        let catalog = JsonCatalog::new(&path);
        let spade = BusinessPlan::CATEGORIES[3];
        let cards: Vec<Card<BusinessAttributes>> = catalog.fetch(&spade).await.expect("fetch");
        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_catalog_error() {
        let catalog = JsonCatalog::new("/nonexistent/cards.json");
        let err = CardCatalog::<BusinessAttributes>::fetch(&catalog, &BusinessPlan::CATEGORIES[0])
            .await
            .expect_err("missing");
        assert_eq!(err.category(), ErrorCategory::CatalogError);
    }
}
