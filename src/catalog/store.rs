//! Catalog store with the derived option lists for the filter chain.

use crate::catalog::{Card, CatalogError, Game, YearRange};
use crate::resolver::chain::{Dimension, FilterSet, FilterValue, OptionProvider};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info};

/// On-disk schema of the catalog file
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    games: Vec<Game>,
    #[serde(default)]
    cards: Vec<Card>,
}

/// Immutable record set of games and cards.
///
/// Games are sorted ascending by (year, name) at construction so that the
/// game option list is stable without re-sorting on every derivation.
/// Cards keep file order; "first match wins" lookups refer to that order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    games: Vec<Game>,
    cards: Vec<Card>,
}

impl Catalog {
    pub fn new(mut games: Vec<Game>, cards: Vec<Card>) -> Result<Self, CatalogError> {
        for card in &cards {
            if !games.iter().any(|g| g.id == card.game_id) {
                return Err(CatalogError::ValidationError(format!(
                    "Card {} ({}) references unknown game id {}",
                    card.id, card.name, card.game_id
                )));
            }
        }

        games.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.name.cmp(&b.name)));

        Ok(Self { games, cards })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::ParseError(e.to_string()))?;
        Self::new(file.games, file.cards)
    }

    /// Loads and validates the catalog file at `path`
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        info!("Loading catalog from {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::ReadError(format!("{}: {}", path.display(), e)))?;

        let catalog = Self::from_toml_str(&content)?;
        info!(
            "Catalog loaded: {} games, {} cards",
            catalog.games.len(),
            catalog.cards.len()
        );
        Ok(catalog)
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn game(&self, id: u32) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    fn game_year(&self, card: &Card) -> Option<u16> {
        self.game(card.game_id).map(|g| g.year)
    }

    /// Century segments covering all game years, keeping only segments that
    /// actually contain a game
    pub fn year_ranges(&self) -> Vec<YearRange> {
        let min_year = match self.games.iter().map(|g| g.year).min() {
            Some(y) => y,
            None => return Vec::new(),
        };
        let max_year = self.games.iter().map(|g| g.year).max().unwrap_or(min_year);

        let start_century = (min_year / 100) * 100;
        let end_century = ((max_year / 100) + 1) * 100;

        let mut ranges = Vec::new();
        let mut start = start_century;
        while start < end_century {
            let range = YearRange {
                start,
                end: start + 100,
            };
            if self.games.iter().any(|g| range.contains(g.year)) {
                ranges.push(range);
            }
            start += 100;
        }

        debug!("Derived {} year ranges", ranges.len());
        ranges
    }

    /// Games within the year range, in catalog order (ascending by year)
    pub fn games_for(&self, year_range: Option<YearRange>) -> Vec<&Game> {
        self.games
            .iter()
            .filter(|g| year_range.map(|r| r.contains(g.year)).unwrap_or(true))
            .collect()
    }

    fn cards_for(&self, year_range: Option<YearRange>, game: Option<u32>) -> Vec<&Card> {
        self.cards
            .iter()
            .filter(|c| {
                year_range
                    .map(|r| self.game_year(c).map(|y| r.contains(y)).unwrap_or(false))
                    .unwrap_or(true)
            })
            .filter(|c| game.map(|id| c.game_id == id).unwrap_or(true))
            .collect()
    }

    /// Unique suits of the candidate cards, ordered by French suit so that
    /// the suit knob keeps a consistent orientation across games.
    ///
    /// Deliberately not narrowed by the rank filter: a suit stays reachable
    /// even when the current rank does not exist in it.
    pub fn suits_for(&self, year_range: Option<YearRange>, game: Option<u32>) -> Vec<String> {
        let mut suits: Vec<(String, String)> = Vec::new();
        for card in self.cards_for(year_range, game) {
            if !suits.iter().any(|(s, _)| *s == card.suit) {
                suits.push((card.suit.clone(), card.french_suit.clone()));
            }
        }

        suits.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        suits.into_iter().map(|(s, _)| s).collect()
    }

    /// Unique ranks of the candidate cards, ordered numerically by French
    /// rank where both sides parse, by native rank as fallback, and
    /// lexicographically by French rank otherwise
    pub fn ranks_for(
        &self,
        year_range: Option<YearRange>,
        game: Option<u32>,
        suit: Option<&str>,
    ) -> Vec<String> {
        let mut ranks: Vec<(String, String)> = Vec::new();
        for card in self.cards_for(year_range, game) {
            if let Some(s) = suit {
                if card.suit != s {
                    continue;
                }
            }
            if !ranks.iter().any(|(r, _)| *r == card.rank) {
                ranks.push((card.rank.clone(), card.french_rank.clone()));
            }
        }

        ranks.sort_by(|a, b| compare_ranks(&a.0, &a.1, &b.0, &b.1));
        ranks.into_iter().map(|(r, _)| r).collect()
    }
}

fn compare_ranks(native_a: &str, french_a: &str, native_b: &str, french_b: &str) -> Ordering {
    match (french_a.parse::<u32>(), french_b.parse::<u32>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => match (native_a.parse::<u32>(), native_b.parse::<u32>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => french_a.cmp(french_b),
        },
    }
}

impl OptionProvider for Catalog {
    fn options(&self, dimension: Dimension, filters: &FilterSet) -> Vec<FilterValue> {
        match dimension {
            Dimension::YearRange => self
                .year_ranges()
                .into_iter()
                .map(FilterValue::YearRange)
                .collect(),
            Dimension::Game => self
                .games_for(filters.year_range())
                .into_iter()
                .map(|g| FilterValue::Game(g.id))
                .collect(),
            Dimension::Suit => self
                .suits_for(filters.year_range(), filters.game())
                .into_iter()
                .map(FilterValue::Suit)
                .collect(),
            Dimension::Rank => self
                .ranks_for(filters.year_range(), filters.game(), filters.suit())
                .into_iter()
                .map(FilterValue::Rank)
                .collect(),
        }
    }

    fn find_card(&self, filters: &FilterSet) -> Option<Card> {
        self.cards
            .iter()
            .filter(|c| {
                filters
                    .year_range()
                    .map(|r| self.game_year(c).map(|y| r.contains(y)).unwrap_or(false))
                    .unwrap_or(true)
            })
            .filter(|c| filters.game().map(|id| c.game_id == id).unwrap_or(true))
            .filter(|c| filters.suit().map(|s| c.suit == s).unwrap_or(true))
            .filter(|c| filters.rank().map(|r| c.rank == r).unwrap_or(true))
            .next()
            .cloned()
    }

    fn find_equivalent(&self, equivalence: &str, filters: &FilterSet) -> Option<Card> {
        self.cards
            .iter()
            .filter(|c| {
                filters
                    .year_range()
                    .map(|r| self.game_year(c).map(|y| r.contains(y)).unwrap_or(false))
                    .unwrap_or(true)
            })
            .filter(|c| filters.game().map(|id| c.game_id == id).unwrap_or(true))
            .find(|c| c.french_equivalence.as_deref() == Some(equivalence))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_CATALOG_TOML;

    fn fixture() -> Catalog {
        Catalog::from_toml_str(DEFAULT_CATALOG_TOML).expect("starter catalog parses")
    }

    #[test]
    fn games_sort_by_year() {
        let catalog = fixture();
        let names: Vec<&str> = catalog.games().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Tarot Ducale", "Piquet", "Tarot de Marseille", "Jass"]
        );
    }

    #[test]
    fn year_ranges_cover_only_occupied_centuries() {
        let catalog = fixture();
        let ranges = catalog.year_ranges();
        assert_eq!(
            ranges,
            vec![
                YearRange {
                    start: 1400,
                    end: 1500
                },
                YearRange {
                    start: 1500,
                    end: 1600
                },
                YearRange {
                    start: 1600,
                    end: 1700
                },
                YearRange {
                    start: 1700,
                    end: 1800
                },
            ]
        );
    }

    #[test]
    fn year_ranges_skip_empty_centuries() {
        let games = vec![
            Game {
                id: 1,
                name: "Old".into(),
                year: 1410,
                description: None,
            },
            Game {
                id: 2,
                name: "New".into(),
                year: 1790,
                description: None,
            },
        ];
        let catalog = Catalog::new(games, Vec::new()).unwrap();
        let ranges = catalog.year_ranges();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start, 1400);
        assert_eq!(ranges[1].start, 1700);
    }

    #[test]
    fn suits_order_by_french_suit_across_games() {
        let catalog = fixture();

        // Jass: Bells carries Carreau, Roses carries Coeur
        let jass = catalog.games().iter().find(|g| g.name == "Jass").unwrap();
        assert_eq!(catalog.suits_for(None, Some(jass.id)), vec!["Bells", "Roses"]);

        // Piquet: Diamonds carries Carreau, Spades carries Pique
        let piquet = catalog.games().iter().find(|g| g.name == "Piquet").unwrap();
        assert_eq!(
            catalog.suits_for(None, Some(piquet.id)),
            vec!["Diamonds", "Spades"]
        );
    }

    #[test]
    fn ranks_order_numerically_by_french_rank() {
        let catalog = fixture();
        let piquet = catalog.games().iter().find(|g| g.name == "Piquet").unwrap();
        // "3" (fr 3) before "King" (fr 13)
        assert_eq!(
            catalog.ranks_for(None, Some(piquet.id), Some("Spades")),
            vec!["3", "King"]
        );
    }

    #[test]
    fn find_card_matches_full_tuple() {
        let catalog = fixture();
        let piquet = catalog.games().iter().find(|g| g.name == "Piquet").unwrap();

        let mut filters = FilterSet::default();
        filters.set(
            Dimension::YearRange,
            Some(FilterValue::YearRange(YearRange {
                start: 1500,
                end: 1600,
            })),
        );
        filters.set(Dimension::Game, Some(FilterValue::Game(piquet.id)));
        filters.set(Dimension::Suit, Some(FilterValue::Suit("Diamonds".into())));
        filters.set(Dimension::Rank, Some(FilterValue::Rank("3".into())));

        let card = catalog.find_card(&filters).expect("card resolves");
        assert_eq!(card.name, "Three of Diamonds");
    }

    #[test]
    fn find_equivalent_crosses_games() {
        let catalog = fixture();
        let marseille = catalog
            .games()
            .iter()
            .find(|g| g.name == "Tarot de Marseille")
            .unwrap();

        let mut filters = FilterSet::default();
        filters.set(Dimension::Game, Some(FilterValue::Game(marseille.id)));

        let card = catalog
            .find_equivalent("3 de Carreau", &filters)
            .expect("equivalent exists");
        assert_eq!(card.name, "Three of Pentacles");
    }

    #[test]
    fn unknown_game_reference_is_rejected() {
        let games = vec![Game {
            id: 1,
            name: "Piquet".into(),
            year: 1535,
            description: None,
        }];
        let cards = vec![Card {
            id: 1,
            name: "Ghost".into(),
            game_id: 99,
            suit: "Spades".into(),
            rank: "3".into(),
            french_suit: "Pique".into(),
            french_rank: "3".into(),
            french_equivalence: None,
        }];
        assert!(matches!(
            Catalog::new(games, cards),
            Err(CatalogError::ValidationError(_))
        ));
    }
}
