//! Card catalog records
//!
//! A [`Card`] is an immutable catalog entry. Its numeric attributes depend on
//! the game being played and are carried in the template's attribute type.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Suit
// ─────────────────────────────────────────────────────────────────────────────

/// Card suit; each template maps the four suits onto its four categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    #[serde(alias = "♥️ハート", alias = "♥", alias = "ハート", alias = "Heart")]
    Heart,
    #[serde(alias = "♦️ダイヤ", alias = "♦", alias = "ダイヤ", alias = "Diamond")]
    Diamond,
    #[serde(alias = "♣️クラブ", alias = "♣", alias = "クラブ", alias = "Club")]
    Club,
    #[serde(alias = "♠️スペード", alias = "♠", alias = "スペード", alias = "Spade")]
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Diamond => "diamond",
            Self::Club => "club",
            Self::Spade => "spade",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Heart => "♥",
            Self::Diamond => "♦",
            Self::Club => "♣",
            Self::Spade => "♠",
        }
    }

    /// Parse a suit from user input (case-insensitive name or symbol)
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        Self::ALL.into_iter().find(|suit| {
            trimmed.eq_ignore_ascii_case(suit.as_str()) || trimmed.starts_with(suit.symbol())
        })
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Card
// ─────────────────────────────────────────────────────────────────────────────

/// One catalog card with template-specific numeric attributes `A`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card<A> {
    pub id: String,
    pub suit: Suit,
    /// A, 2..10, J, Q, K
    pub rank: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor_text: Option<String>,
    #[serde(default)]
    pub card_name: String,
    #[serde(flatten)]
    pub attributes: A,
}

impl<A> Card<A> {
    /// Position of the rank in A, 2..10, J, Q, K order; unknown ranks sort last
    pub fn rank_ordinal(&self) -> u8 {
        rank_ordinal(&self.rank)
    }

    /// `"{rank} - {title}"`, the label used in prompts and save summaries
    pub fn label(&self) -> String {
        format!("{} - {}", self.rank, self.title)
    }
}

/// Ordinal of a rank string (A=1 .. K=13, unknown=14)
pub fn rank_ordinal(rank: &str) -> u8 {
    match rank.trim().to_ascii_uppercase().as_str() {
        "A" => 1,
        "J" => 11,
        "Q" => 12,
        "K" => 13,
        other => match other.parse::<u8>() {
            Ok(n) if (2..=10).contains(&n) => n,
            _ => 14,
        },
    }
}
