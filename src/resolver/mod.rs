//! Selection subsystem: turns raw knob sample batches into stable card
//! filter selections.
//!
//! The resolver maps each noisy potentiometer sample onto an index into
//! the current option list with hysteresis and deadband rules, drives the
//! dependent filter chain per card slot, and emits plain-data events for
//! the downstream consumer. Nothing in here knows about rendering; the
//! presentation layer only ever sees [`SelectionEvent`] values.

pub mod chain;
pub mod engine;
pub mod error;
pub mod knob;
pub mod pagination;

pub use chain::{Dimension, FilterSet, FilterValue, OptionProvider, SlotSelector};
pub use engine::{EngineSettings, SelectionEngine, SelectionEngineHandle, SelectionEngineState};
pub use error::SelectionError;
pub use knob::{KnobId, KnobResolver, ResolverSettings};
pub use pagination::{DotMode, PaginationDescriptor};

use crate::catalog::Card;
use chrono::{DateTime, Local};

/// Identifies one card slot, `0..slot_count`
pub type SlotId = usize;

/// Output event type of the selection engine
#[derive(Debug, Clone)]
pub enum SelectionEvent {
    /// One filter dimension of a slot resolved to a different value
    FilterChanged {
        slot: SlotId,
        dimension: Dimension,
        value: Option<FilterValue>,
    },

    /// A slot's filter tuple now identifies a different card (or none)
    CardResolved { slot: SlotId, card: Option<Card> },

    /// Display aid: dot window for one knob of one slot
    Pagination {
        slot: SlotId,
        dimension: Dimension,
        descriptor: PaginationDescriptor,
    },

    /// The hardware confirm button was pressed
    Confirmed { timestamp: DateTime<Local> },
}

/// Rate limiter for event emission
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum interval between processed events (milliseconds)
    pub min_interval_ms: u64,

    /// Instant of the last processed event
    last_event_time: std::time::Instant,
}

impl RateLimiter {
    /// Creates a rate limiter that lets the first call through immediately
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_event_time: std::time::Instant::now() - std::time::Duration::from_secs(1),
        }
    }

    /// Checks whether enough time has passed since the last processed event
    pub fn should_process(&mut self) -> bool {
        let now = std::time::Instant::now();
        let elapsed = now.duration_since(self.last_event_time);

        if elapsed.as_millis() as u64 >= self.min_interval_ms {
            self.last_event_time = now;
            true
        } else {
            false
        }
    }
}
