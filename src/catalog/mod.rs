//! # Card Catalog
//!
//! In-memory record set of historical card games and their cards, loaded
//! once at startup from a TOML file. The catalog is the single source for
//! every option list in the filter chain: year ranges, games, suits and
//! ranks are all derived from it.
//!
//! ## Ordering Contract
//!
//! Derived option lists must be order-stable across repeated calls for the
//! same filter inputs, because the knob resolver's index arithmetic depends
//! on position. The ordering rules are fixed at load time:
//! - games sort ascending by (year, name)
//! - suits sort by their French-suit name, so suit order is consistent
//!   across games with different native suit names
//! - ranks sort numerically by French rank where possible
//!
//! ## Failure Strategy
//!
//! A missing or malformed catalog file is a startup error with context.
//! Once loaded, the catalog is immutable and lookups cannot fail; an empty
//! result list is a valid answer, not an error.

pub mod store;

pub use store::Catalog;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while loading or validating a catalog file
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Failed to read catalog file: {0}")]
    ReadError(String),

    /// The catalog file is not valid TOML for the expected schema
    #[error("Failed to parse catalog file: {0}")]
    ParseError(String),

    /// The record set is internally inconsistent
    #[error("Invalid catalog: {0}")]
    ValidationError(String),
}

/// A historical card game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: u32,
    pub name: String,
    /// First documented year of the game, drives the year-range segments
    pub year: u16,
    #[serde(default)]
    pub description: Option<String>,
}

/// A single card record
///
/// The `french_*` fields carry the French-deck name of the suit and rank,
/// used both as the cross-game sort key and for the equivalence label
/// ("3 de Carreau") that identifies "the same card" across games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub name: String,
    pub game_id: u32,
    pub suit: String,
    pub rank: String,
    pub french_suit: String,
    pub french_rank: String,
    #[serde(default)]
    pub french_equivalence: Option<String>,
}

/// A century segment of game years, half-open: `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: u16,
    pub end: u16,
}

impl YearRange {
    pub fn contains(&self, year: u16) -> bool {
        year >= self.start && year < self.end
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Built-in starter catalog written on first startup when no catalog file
/// exists yet. Years and descriptions follow the documented history of the
/// physical decks the installation ships with.
pub const DEFAULT_CATALOG_TOML: &str = r#"# knobdeck starter catalog

[[games]]
id = 1
name = "Tarot Ducale"
year = 1499
description = "Tarot decks from the ducal courts of northern Italy, introduced into southern France with the conquest of Milan in 1499."

[[games]]
id = 2
name = "Piquet"
year = 1535
description = "Early 16th-century French card game for two players, first mentioned in 1535 by Rabelais. Played with a 32-card deck."

[[games]]
id = 3
name = "Tarot de Marseille"
year = 1639
description = "Standard pattern of Italian-suited tarot pack with 78 cards; the earliest surviving cards were produced in Marseilles in 1639."

[[games]]
id = 4
name = "Jass"
year = 1796
description = "Switzerland's national card game, first mentioned in 1796, played with 36 Swiss-suited cards."

[[cards]]
id = 1
name = "Cavalier of Swords"
game_id = 1
suit = "Swords"
rank = "Cavalier"
french_suit = "Pique"
french_rank = "11"
french_equivalence = "Cavalier de Pique"

[[cards]]
id = 2
name = "Three of Swords"
game_id = 1
suit = "Swords"
rank = "3"
french_suit = "Pique"
french_rank = "3"
french_equivalence = "3 de Pique"

[[cards]]
id = 3
name = "Three of Coins"
game_id = 1
suit = "Coins"
rank = "3"
french_suit = "Carreau"
french_rank = "3"
french_equivalence = "3 de Carreau"

[[cards]]
id = 4
name = "King of Coins"
game_id = 1
suit = "Coins"
rank = "Roi"
french_suit = "Carreau"
french_rank = "13"
french_equivalence = "Roi de Carreau"

[[cards]]
id = 5
name = "Three of Spades"
game_id = 2
suit = "Spades"
rank = "3"
french_suit = "Pique"
french_rank = "3"
french_equivalence = "3 de Pique"

[[cards]]
id = 6
name = "King of Spades"
game_id = 2
suit = "Spades"
rank = "King"
french_suit = "Pique"
french_rank = "13"
french_equivalence = "Roi de Pique"

[[cards]]
id = 7
name = "Three of Diamonds"
game_id = 2
suit = "Diamonds"
rank = "3"
french_suit = "Carreau"
french_rank = "3"
french_equivalence = "3 de Carreau"

[[cards]]
id = 8
name = "King of Diamonds"
game_id = 2
suit = "Diamonds"
rank = "King"
french_suit = "Carreau"
french_rank = "13"
french_equivalence = "Roi de Carreau"

[[cards]]
id = 9
name = "Three of Pentacles"
game_id = 3
suit = "Pentacles"
rank = "3"
french_suit = "Carreau"
french_rank = "3"
french_equivalence = "3 de Carreau"

[[cards]]
id = 10
name = "Queen of Pentacles"
game_id = 3
suit = "Pentacles"
rank = "Queen"
french_suit = "Carreau"
french_rank = "12"
french_equivalence = "Dame de Carreau"

[[cards]]
id = 11
name = "Three of Cups"
game_id = 3
suit = "Cups"
rank = "3"
french_suit = "Coeur"
french_rank = "3"
french_equivalence = "3 de Coeur"

[[cards]]
id = 12
name = "Queen of Cups"
game_id = 3
suit = "Cups"
rank = "Queen"
french_suit = "Coeur"
french_rank = "12"
french_equivalence = "Dame de Coeur"

[[cards]]
id = 13
name = "Three of Roses"
game_id = 4
suit = "Roses"
rank = "3"
french_suit = "Coeur"
french_rank = "3"
french_equivalence = "3 de Coeur"

[[cards]]
id = 14
name = "Ober of Roses"
game_id = 4
suit = "Roses"
rank = "Ober"
french_suit = "Coeur"
french_rank = "12"
french_equivalence = "Dame de Coeur"

[[cards]]
id = 15
name = "Three of Bells"
game_id = 4
suit = "Bells"
rank = "3"
french_suit = "Carreau"
french_rank = "3"
french_equivalence = "3 de Carreau"

[[cards]]
id = 16
name = "Ober of Bells"
game_id = 4
suit = "Bells"
rank = "Ober"
french_suit = "Carreau"
french_rank = "12"
french_equivalence = "Dame de Carreau"
"#;
