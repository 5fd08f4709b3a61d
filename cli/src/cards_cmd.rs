use crate::Game;
use cardquest_scenario::adapters::JsonCatalog;
use cardquest_scenario::{BusinessPlan, CardQuestConfig, Catalog, PolicyPlan, Template};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
pub struct CardsArgs {
    /// Which game's catalog to list
    #[arg(long, value_enum, default_value_t = Game::Business)]
    pub game: Game,

    /// Card file (defaults to the configured catalog)
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CardsArgs {
    pub async fn execute(&self, cfg: &CardQuestConfig) -> anyhow::Result<()> {
        let path = match (&self.catalog, self.game) {
            (Some(path), _) => path.clone(),
            (None, Game::Business) => cfg.resolved_business_catalog(),
            (None, Game::Policy) => cfg.resolved_policy_catalog(),
        };
        let rendered = match self.game {
            Game::Business => list::<BusinessPlan>(&path, self.json).await?,
            Game::Policy => list::<PolicyPlan>(&path, self.json).await?,
        };
        print!("{rendered}");
        Ok(())
    }
}

async fn list<T: Template>(path: &Path, json: bool) -> anyhow::Result<String> {
    let catalog = Catalog::<T>::load(&JsonCatalog::new(path)).await?;
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&catalog)?));
    }
    Ok(render(&catalog))
}

fn render<T: Template>(catalog: &Catalog<T>) -> String {
    let mut out = String::new();
    for (index, category) in T::CATEGORIES.iter().enumerate() {
        out.push_str(&format!(
            "{} {} ({}): {}\n",
            category.suit.symbol(),
            category.label,
            category.key,
            category.question
        ));
        let cards = catalog.cards(index);
        if cards.is_empty() {
            out.push_str("  (no cards)\n");
        }
        for card in cards {
            out.push_str(&format!("  {:<24} {}\n", card.id, card.label()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardquest_scenario::template::business::BusinessAttributes;
    use cardquest_scenario::{Card, Suit};

    #[test]
    fn test_render_groups_by_category() {
        let ace = Card {
            id: "students".to_string(),
            suit: Suit::Heart,
            rank: "A".to_string(),
            title: "University students".to_string(),
            description: String::new(),
            flavor_text: None,
            card_name: String::new(),
            attributes: BusinessAttributes::default(),
        };
        let catalog = Catalog::<BusinessPlan>::from_cards([vec![ace], vec![], vec![], vec![]]);
        let out = render(&catalog);

        assert!(out.starts_with(&format!("{} Persona (persona)", Suit::Heart.symbol())));
        assert!(out.contains("students"));
        assert!(out.contains("A - University students"));
        assert_eq!(out.matches("(no cards)").count(), 3);
    }
}
