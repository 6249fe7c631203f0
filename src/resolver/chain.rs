//! Dependent filter chain per card slot.
//!
//! Each slot owns four filter dimensions resolved in fixed order: year
//! range, game, suit, rank. A dimension's candidate list depends on the
//! already-resolved values of the earlier dimensions *in the same pass*,
//! so turning the game knob changes what the suit knob is selecting from
//! before the suit sample is quantized.
//!
//! Changes are detected by value equality, never by index equality: the
//! option list itself may have shifted underneath an unchanged index.

use crate::catalog::{Card, YearRange};
use crate::resolver::knob::{KnobId, KnobResolver};
use crate::resolver::pagination;
use crate::resolver::{SelectionEvent, SlotId};
use std::fmt;
use tracing::{debug, info, warn};

/// Knobs per card slot, one per filter dimension
pub const KNOBS_PER_SLOT: usize = 4;

/// The four filter dimensions, in resolve order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    YearRange,
    Game,
    Suit,
    Rank,
}

impl Dimension {
    pub const ALL: [Dimension; KNOBS_PER_SLOT] = [
        Dimension::YearRange,
        Dimension::Game,
        Dimension::Suit,
        Dimension::Rank,
    ];

    /// Position in the resolve order, also the knob offset within a slot
    pub fn index(self) -> usize {
        match self {
            Dimension::YearRange => 0,
            Dimension::Game => 1,
            Dimension::Suit => 2,
            Dimension::Rank => 3,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::YearRange => write!(f, "Year Range"),
            Dimension::Game => write!(f, "Game"),
            Dimension::Suit => write!(f, "Suit"),
            Dimension::Rank => write!(f, "Rank"),
        }
    }
}

/// A resolved value for one filter dimension
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    YearRange(YearRange),
    Game(u32),
    Suit(String),
    Rank(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::YearRange(range) => write!(f, "{}", range),
            FilterValue::Game(id) => write!(f, "game #{}", id),
            FilterValue::Suit(suit) => write!(f, "{}", suit),
            FilterValue::Rank(rank) => write!(f, "{}", rank),
        }
    }
}

/// The current filter tuple of one slot, one optional value per dimension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    values: [Option<FilterValue>; KNOBS_PER_SLOT],
}

impl FilterSet {
    pub fn get(&self, dimension: Dimension) -> Option<&FilterValue> {
        self.values[dimension.index()].as_ref()
    }

    pub fn set(&mut self, dimension: Dimension, value: Option<FilterValue>) {
        self.values[dimension.index()] = value;
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_some())
    }

    pub fn year_range(&self) -> Option<YearRange> {
        match self.get(Dimension::YearRange) {
            Some(FilterValue::YearRange(range)) => Some(*range),
            _ => None,
        }
    }

    pub fn game(&self) -> Option<u32> {
        match self.get(Dimension::Game) {
            Some(FilterValue::Game(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn suit(&self) -> Option<&str> {
        match self.get(Dimension::Suit) {
            Some(FilterValue::Suit(suit)) => Some(suit.as_str()),
            _ => None,
        }
    }

    pub fn rank(&self) -> Option<&str> {
        match self.get(Dimension::Rank) {
            Some(FilterValue::Rank(rank)) => Some(rank.as_str()),
            _ => None,
        }
    }
}

/// Supplies ordered candidate lists and card lookups to the chain.
///
/// Implementations must be deterministic and order-stable for identical
/// inputs; the resolver's index arithmetic depends on it. Non-determinism
/// is not detectable here and manifests as spurious index jumps.
pub trait OptionProvider {
    /// Ordered candidates for `dimension` given the earlier dimensions
    fn options(&self, dimension: Dimension, filters: &FilterSet) -> Vec<FilterValue>;

    /// First card matching every set filter, in catalog order
    fn find_card(&self, filters: &FilterSet) -> Option<Card>;

    /// First card matching the equivalence label within the set filters
    fn find_equivalent(&self, equivalence: &str, filters: &FilterSet) -> Option<Card>;
}

/// One independently configurable card slot.
///
/// Owns the slot's filter tuple and selected card; the per-knob hysteresis
/// state lives in the shared [`KnobResolver`], addressed through the
/// slot's knob base offset.
#[derive(Debug)]
pub struct SlotSelector {
    slot: SlotId,
    knob_base: KnobId,
    filters: FilterSet,
    selected_card: Option<Card>,
}

impl SlotSelector {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            knob_base: slot * KNOBS_PER_SLOT,
            filters: FilterSet::default(),
            selected_card: None,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn selected_card(&self) -> Option<&Card> {
        self.selected_card.as_ref()
    }

    /// Resolves the slot's four raw samples through the dependent chain.
    ///
    /// Returns true if any filter value changed; pushed events cover
    /// per-dimension pagination, filter changes, and the card resolution
    /// when the tuple changed.
    pub fn apply_samples(
        &mut self,
        resolver: &mut KnobResolver,
        provider: &dyn OptionProvider,
        raw: &[u16],
        events: &mut Vec<SelectionEvent>,
    ) -> bool {
        if raw.len() < KNOBS_PER_SLOT {
            warn!(
                "Slot {} received {} samples, expected {}",
                self.slot,
                raw.len(),
                KNOBS_PER_SLOT
            );
            return false;
        }

        let mut changed = false;
        let mut equivalence_target: Option<Card> = None;

        for dimension in Dimension::ALL {
            let knob = self.knob_base + dimension.index();
            let raw_value = raw[dimension.index()];

            // A matched equivalence rewrites suit and rank from the card
            // instead of quantizing the raw samples on this pass.
            if let Some(card) = &equivalence_target {
                if matches!(dimension, Dimension::Suit | Dimension::Rank) {
                    let rewritten = match dimension {
                        Dimension::Suit => FilterValue::Suit(card.suit.clone()),
                        _ => FilterValue::Rank(card.rank.clone()),
                    };
                    let options = provider.options(dimension, &self.filters);
                    if let Some(index) = options.iter().position(|v| *v == rewritten) {
                        resolver.seed(knob, raw_value, index, options.len());
                        events.push(SelectionEvent::Pagination {
                            slot: self.slot,
                            dimension,
                            descriptor: pagination::window(index, options.len()),
                        });
                        if self.filters.get(dimension) != Some(&rewritten) {
                            debug!(
                                "Slot {} {} rewritten to {} by equivalence",
                                self.slot, dimension, rewritten
                            );
                            self.filters.set(dimension, Some(rewritten.clone()));
                            changed = true;
                            events.push(SelectionEvent::FilterChanged {
                                slot: self.slot,
                                dimension,
                                value: Some(rewritten),
                            });
                        }
                        continue;
                    }
                    // Matched card not present in the candidate list; fall
                    // back to normal resolution.
                }
            }

            let options = provider.options(dimension, &self.filters);
            let index = resolver.resolve_index(knob, raw_value, options.len());
            let value = if options.is_empty() {
                None
            } else {
                options.get(index).cloned()
            };

            events.push(SelectionEvent::Pagination {
                slot: self.slot,
                dimension,
                descriptor: pagination::window(index, options.len()),
            });

            if value.as_ref() != self.filters.get(dimension) {
                let previous_equivalence = if dimension == Dimension::Game {
                    self.selected_card
                        .as_ref()
                        .and_then(|c| c.french_equivalence.clone())
                } else {
                    None
                };

                self.filters.set(dimension, value.clone());
                changed = true;
                events.push(SelectionEvent::FilterChanged {
                    slot: self.slot,
                    dimension,
                    value: value.clone(),
                });

                // The game changed under a selected card: look for the
                // same card (by French equivalence) in the new game.
                if let Some(equivalence) = previous_equivalence {
                    if let Some(card) = provider.find_equivalent(&equivalence, &self.filters) {
                        info!(
                            "Slot {} keeping \"{}\" across game switch as \"{}\"",
                            self.slot, equivalence, card.name
                        );
                        equivalence_target = Some(card);
                    }
                }
            }
        }

        if changed {
            let card = if self.filters.is_complete() {
                provider.find_card(&self.filters)
            } else {
                None
            };
            if card != self.selected_card {
                self.selected_card = card.clone();
                events.push(SelectionEvent::CardResolved {
                    slot: self.slot,
                    card,
                });
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, DEFAULT_CATALOG_TOML};
    use crate::resolver::knob::ResolverSettings;

    fn resolver() -> KnobResolver {
        KnobResolver::new(ResolverSettings::default())
    }

    fn filter_changes(events: &[SelectionEvent]) -> Vec<(Dimension, Option<FilterValue>)> {
        events
            .iter()
            .filter_map(|e| match e {
                SelectionEvent::FilterChanged {
                    dimension, value, ..
                } => Some((*dimension, value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Two year ranges; the later one holds three games, the earlier one a
    /// single game. Suits and ranks are uniform so the cascade is isolated
    /// to the game dimension.
    const CASCADE_CATALOG: &str = r#"
[[games]]
id = 1
name = "Karnoeffel"
year = 1450

[[games]]
id = 2
name = "Jass"
year = 1610

[[games]]
id = 3
name = "Hombre"
year = 1630

[[games]]
id = 4
name = "Piquet Imperial"
year = 1650

[[cards]]
id = 1
name = "Three of Bells"
game_id = 1
suit = "Bells"
rank = "3"
french_suit = "Carreau"
french_rank = "3"

[[cards]]
id = 2
name = "Jass Three of Bells"
game_id = 2
suit = "Bells"
rank = "3"
french_suit = "Carreau"
french_rank = "3"

[[cards]]
id = 3
name = "Hombre Three of Bells"
game_id = 3
suit = "Bells"
rank = "3"
french_suit = "Carreau"
french_rank = "3"

[[cards]]
id = 4
name = "Imperial Three of Bells"
game_id = 4
suit = "Bells"
rank = "3"
french_suit = "Carreau"
french_rank = "3"
"#;

    #[test]
    fn year_change_cascades_into_game_reset() {
        let catalog = Catalog::from_toml_str(CASCADE_CATALOG).unwrap();
        let mut resolver = resolver();
        let mut slot = SlotSelector::new(0);
        let mut events = Vec::new();

        // Year knob on the 1600 century, game knob in the middle of three
        // options (index 1 of Hombre/Jass/Piquet Imperial by year order:
        // Jass 1610, Hombre 1630, Piquet Imperial 1650).
        let changed = slot.apply_samples(&mut resolver, &catalog, &[800, 400, 100, 100], &mut events);
        assert!(changed);
        assert_eq!(
            slot.filters().year_range(),
            Some(YearRange {
                start: 1600,
                end: 1700
            })
        );
        assert_eq!(slot.filters().game(), Some(3)); // Hombre

        // Year knob turned down to the 1400 century: only one game exists
        // there, so the game dimension must collapse to it without error.
        events.clear();
        let changed = slot.apply_samples(&mut resolver, &catalog, &[100, 400, 100, 100], &mut events);
        assert!(changed);
        assert_eq!(
            slot.filters().year_range(),
            Some(YearRange {
                start: 1400,
                end: 1500
            })
        );
        assert_eq!(slot.filters().game(), Some(1));
        assert_eq!(slot.selected_card().unwrap().name, "Three of Bells");
    }

    #[test]
    fn unchanged_samples_report_no_change() {
        let catalog = Catalog::from_toml_str(CASCADE_CATALOG).unwrap();
        let mut resolver = resolver();
        let mut slot = SlotSelector::new(0);
        let mut events = Vec::new();

        assert!(slot.apply_samples(&mut resolver, &catalog, &[800, 400, 100, 100], &mut events));

        events.clear();
        let changed =
            slot.apply_samples(&mut resolver, &catalog, &[800, 400, 100, 100], &mut events);
        assert!(!changed);
        assert!(filter_changes(&events).is_empty());
        assert!(!events
            .iter()
            .any(|e| matches!(e, SelectionEvent::CardResolved { .. })));
    }

    /// No equivalence labels here: a game switch leaves the dependent
    /// knobs where they are and the shifted option lists alone must
    /// trigger the change signal.
    const VALUE_SHIFT_CATALOG: &str = r#"
[[games]]
id = 1
name = "Karnoeffel"
year = 1450

[[games]]
id = 2
name = "Piquet"
year = 1535

[[cards]]
id = 1
name = "Three of Bells"
game_id = 1
suit = "Bells"
rank = "3"
french_suit = "Carreau"
french_rank = "3"

[[cards]]
id = 2
name = "Three of Diamonds"
game_id = 2
suit = "Diamonds"
rank = "3"
french_suit = "Carreau"
french_rank = "3"
"#;

    #[test]
    fn change_detection_is_by_value_not_index() {
        let catalog = Catalog::from_toml_str(VALUE_SHIFT_CATALOG).unwrap();
        let mut resolver = resolver();
        let mut slot = SlotSelector::new(0);
        let mut events = Vec::new();

        // Year index 0 (1400-1500, Karnoeffel): suit index 0 is Bells.
        slot.apply_samples(&mut resolver, &catalog, &[100, 100, 100, 100], &mut events);
        assert_eq!(slot.filters().suit(), Some("Bells"));

        // Year up to 1500-1600 (Piquet): suit knob untouched, index 0
        // again, but the list now starts with Diamonds. Must be detected.
        events.clear();
        slot.apply_samples(&mut resolver, &catalog, &[800, 100, 100, 100], &mut events);
        assert_eq!(slot.filters().suit(), Some("Diamonds"));
        assert!(filter_changes(&events)
            .iter()
            .any(|(d, v)| *d == Dimension::Suit
                && *v == Some(FilterValue::Suit("Diamonds".into()))));
    }

    #[test]
    fn game_switch_preserves_french_equivalence() {
        let catalog = Catalog::from_toml_str(DEFAULT_CATALOG_TOML).unwrap();
        let mut resolver = resolver();
        let mut slot = SlotSelector::new(0);
        let mut events = Vec::new();

        // 1500-1600 / Piquet / Diamonds / 3 -> "Three of Diamonds",
        // equivalence "3 de Carreau".
        slot.apply_samples(&mut resolver, &catalog, &[400, 100, 100, 100], &mut events);
        assert_eq!(slot.selected_card().unwrap().name, "Three of Diamonds");

        // Year up to 1600-1700: the game collapses to Tarot de Marseille
        // and the equivalence match carries the card over as pentacles.
        events.clear();
        slot.apply_samples(&mut resolver, &catalog, &[600, 100, 100, 100], &mut events);
        assert_eq!(slot.filters().suit(), Some("Pentacles"));
        assert_eq!(slot.selected_card().unwrap().name, "Three of Pentacles");
    }

    #[test]
    fn short_sample_slice_is_rejected() {
        let catalog = Catalog::from_toml_str(CASCADE_CATALOG).unwrap();
        let mut resolver = resolver();
        let mut slot = SlotSelector::new(0);
        let mut events = Vec::new();

        let changed = slot.apply_samples(&mut resolver, &catalog, &[800, 400], &mut events);
        assert!(!changed);
        assert!(events.is_empty());
    }

    #[test]
    fn slots_use_disjoint_knob_ranges() {
        let catalog = Catalog::from_toml_str(CASCADE_CATALOG).unwrap();
        let mut resolver = resolver();
        let mut slot_a = SlotSelector::new(0);
        let mut slot_b = SlotSelector::new(1);
        let mut events = Vec::new();

        slot_a.apply_samples(&mut resolver, &catalog, &[800, 400, 100, 100], &mut events);
        slot_b.apply_samples(&mut resolver, &catalog, &[100, 900, 100, 100], &mut events);

        assert_eq!(slot_a.filters().game(), Some(3));
        assert_eq!(slot_b.filters().game(), Some(1));
        // Slot A's hysteresis state is untouched by slot B's pass.
        events.clear();
        let changed =
            slot_a.apply_samples(&mut resolver, &catalog, &[800, 400, 100, 100], &mut events);
        assert!(!changed);
    }
}
