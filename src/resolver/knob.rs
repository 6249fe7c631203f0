//! Per-knob quantization with hysteresis and deadband.
//!
//! Maps a noisy raw potentiometer sample (0-1023) onto an index into an
//! option list of known size, such that sensor jitter never flips the
//! selection but a deliberate, sustained turn reliably does.
//!
//! # Acceptance Rule
//!
//! ```text
//!  band i          band i+1
//! ┌─────────┬────╂────┬─────────┐
//!      center   mid+margin  center
//! ```
//!
//! A proposed index change is accepted only once the raw value has moved
//! past the midpoint of the two band centers by more than the hysteresis
//! margin in the direction of travel. A deadband in front of the whole
//! evaluation discards samples that differ from the last accepted raw
//! value by less than a few units.

use std::collections::HashMap;
use tracing::{debug, trace};

/// Full span of the analog input domain (10-bit ADC)
pub const RAW_SPAN: f32 = 1024.0;

/// Highest raw value the sampler can report
pub const RAW_MAX: u16 = 1023;

/// Identifies one physical knob; stable for the lifetime of a session
pub type KnobId = usize;

/// Tuning for hysteresis acceptance and noise suppression
///
/// # Tuning Impact
///
/// - `hysteresis_margin`: raw units past the band midpoint required to
///   accept an index change. Too low lets boundary jitter flip the
///   selection; too high makes short turns feel unresponsive.
/// - `deadband`: raw delta below which a sample is ignored entirely.
///   Filters the +-2..3 unit flutter of a resting potentiometer before
///   any band math runs.
#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    pub hysteresis_margin: u16,
    pub deadband: u16,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            hysteresis_margin: 20, // holds through observed boundary flicker
            deadband: 5,
        }
    }
}

/// Sliding per-knob state, mutated only by the resolver
#[derive(Debug, Clone, Default)]
struct KnobState {
    /// Last accepted raw sample
    raw_value: u16,
    /// Last confirmed index, None before the first sample
    resolved: Option<usize>,
    /// Option count at the last resolve; a mismatch forces a fresh accept
    num_options: usize,
}

/// Owns the per-knob state table and applies the quantization rules.
///
/// A single resolver instance serves all knobs; callers identify a knob by
/// its [`KnobId`]. Calls for a given knob must not be interleaved
/// concurrently (single-writer), which the engine guarantees by owning the
/// resolver inside one task.
#[derive(Debug)]
pub struct KnobResolver {
    settings: ResolverSettings,
    knobs: HashMap<KnobId, KnobState>,
}

impl KnobResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            knobs: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolves `raw_value` to a stable index in `0..num_options`.
    ///
    /// Returns 0 when `num_options` is 0; the caller must treat that as
    /// "no valid selection". The result is always `< num_options` for
    /// `num_options > 0`, including right after the option count shrank.
    pub fn resolve_index(&mut self, knob: KnobId, raw_value: u16, num_options: usize) -> usize {
        let raw = raw_value.min(RAW_MAX);

        // 0 options: nothing to select, leave the knob state alone.
        // 1 option: unambiguous, and skipping the state update means the
        // knob re-accepts fresh once real options come back.
        if num_options <= 1 {
            return 0;
        }

        let quantized = quantize(raw, num_options);
        let state = self.knobs.entry(knob).or_default();

        // Reset path: first sample, option count changed upstream, or the
        // stored index no longer exists. Checked before the deadband so a
        // shrunken option list is never masked by a small raw delta.
        let stale = match state.resolved {
            None => true,
            Some(idx) => state.num_options != num_options || idx >= num_options,
        };
        if stale {
            debug!(
                "Knob {} accepting fresh index {} ({} options)",
                knob, quantized, num_options
            );
            state.raw_value = raw;
            state.resolved = Some(quantized);
            state.num_options = num_options;
            return quantized;
        }

        let previous = state.resolved.unwrap_or(0);

        let delta = (raw as i32 - state.raw_value as i32).unsigned_abs() as u16;
        if delta < self.settings.deadband {
            trace!("Knob {} delta {} below deadband", knob, delta);
            return previous;
        }

        if quantized == previous {
            state.raw_value = raw;
            return previous;
        }

        let step = RAW_SPAN / num_options as f32;
        let previous_center = (previous as f32 + 0.5) * step;
        let proposed_center = (quantized as f32 + 0.5) * step;
        let midpoint = (previous_center + proposed_center) / 2.0;

        // The margin must stay inside the adjacent band, or the edge
        // indices become unreachable when bands are narrower than it.
        let margin = (self.settings.hysteresis_margin as f32).min(step * 0.45);

        let accept = if quantized > previous {
            raw as f32 > midpoint + margin
        } else {
            (raw as f32) < midpoint - margin
        };

        if accept {
            debug!(
                "Knob {} switched {} -> {} at raw {}",
                knob, previous, quantized, raw
            );
            state.resolved = Some(quantized);
        }
        state.raw_value = raw;
        state.resolved.unwrap_or(quantized)
    }

    /// Overwrites a knob's state with an externally chosen index. The
    /// selection holds while the knob rests inside the deadband; a
    /// deliberate turn re-resolves from the raw position as usual.
    ///
    /// Used by the filter chain when an equivalence match rewrites the
    /// suit/rank selection during a game switch.
    pub fn seed(&mut self, knob: KnobId, raw_value: u16, index: usize, num_options: usize) {
        let state = self.knobs.entry(knob).or_default();
        state.raw_value = raw_value.min(RAW_MAX);
        state.resolved = Some(index.min(num_options.saturating_sub(1)));
        state.num_options = num_options;
    }
}

/// Full-range quantization: `floor(raw / 1024 * n)`, clamped into the list
fn quantize(raw: u16, num_options: usize) -> usize {
    let index = (raw as f32 / RAW_SPAN * num_options as f32) as usize;
    index.min(num_options - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> KnobResolver {
        KnobResolver::new(ResolverSettings::default())
    }

    #[test]
    fn first_sample_accepts_immediately() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 500, 7), 3);
    }

    #[test]
    fn zero_options_returns_sentinel() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 900, 0), 0);
        // and does not poison later resolves
        assert_eq!(r.resolve_index(0, 900, 4), 3);
    }

    #[test]
    fn single_option_is_unambiguous() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 1023, 1), 0);
        assert_eq!(r.resolve_index(0, 0, 1), 0);
    }

    #[test]
    fn deadband_suppresses_micro_fluctuation() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 500, 7), 3);
        assert_eq!(r.resolve_index(0, 503, 7), 3);
        assert_eq!(r.resolve_index(0, 498, 7), 3);
    }

    #[test]
    fn deliberate_turn_crosses_within_one_call() {
        // Band width for 7 options is ~146.3; centers of bands 3 and 4 sit
        // at ~512 and ~658, midpoint ~585, threshold ~605 with margin 20.
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 500, 7), 3);
        assert_eq!(r.resolve_index(0, 700, 7), 4);
    }

    #[test]
    fn boundary_hold_does_not_oscillate() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 500, 7), 3);
        // Just past the raw band boundary (~585 midpoint) but inside the
        // hysteresis margin: proposal must be rejected, repeatedly.
        for raw in [590, 596, 602, 596, 590] {
            assert_eq!(r.resolve_index(0, raw, 7), 3);
        }
    }

    #[test]
    fn monotonic_sweep_visits_every_index_in_order() {
        for num_options in [2usize, 3, 5, 7, 12] {
            let mut r = resolver();
            let mut seen = Vec::new();
            let mut raw = 0u16;
            loop {
                let idx = r.resolve_index(0, raw, num_options);
                if seen.last() != Some(&idx) {
                    seen.push(idx);
                }
                if raw == RAW_MAX {
                    break;
                }
                raw = (raw + 8).min(RAW_MAX);
            }
            let expected: Vec<usize> = (0..num_options).collect();
            assert_eq!(seen, expected, "ascending sweep with {} options", num_options);

            // and back down
            let mut seen = Vec::new();
            let mut raw = RAW_MAX;
            loop {
                let idx = r.resolve_index(0, raw, num_options);
                if seen.last() != Some(&idx) {
                    seen.push(idx);
                }
                if raw == 0 {
                    break;
                }
                raw = raw.saturating_sub(8);
            }
            let expected: Vec<usize> = (0..num_options).rev().collect();
            assert_eq!(seen, expected, "descending sweep with {} options", num_options);
        }
    }

    #[test]
    fn shrunken_option_count_never_returns_stale_index() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 1000, 7), 6);
        let idx = r.resolve_index(0, 1000, 3);
        assert!(idx < 3);
        assert_eq!(idx, 2);
    }

    #[test]
    fn option_count_change_resets_hysteresis() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 500, 7), 3);
        // Same raw value, new option count: fresh quantization, no
        // hysteresis carry-over.
        assert_eq!(r.resolve_index(0, 500, 4), 1);
    }

    #[test]
    fn repeated_identical_calls_are_idempotent() {
        let mut r = resolver();
        let first = r.resolve_index(0, 733, 9);
        let second = r.resolve_index(0, 733, 9);
        let third = r.resolve_index(0, 733, 9);
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn knobs_do_not_share_state() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 100, 4), 0);
        assert_eq!(r.resolve_index(1, 1000, 4), 3);
        assert_eq!(r.resolve_index(0, 102, 4), 0);
    }

    #[test]
    fn out_of_range_raw_is_clamped() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, u16::MAX, 4), 3);
    }

    #[test]
    fn seed_holds_while_knob_rests() {
        let mut r = resolver();
        assert_eq!(r.resolve_index(0, 500, 4), 1);
        r.seed(0, 500, 3, 4);
        // Resting flutter stays below the deadband: the seeded index holds.
        assert_eq!(r.resolve_index(0, 503, 4), 3);
        assert_eq!(r.resolve_index(0, 498, 4), 3);
        // A deliberate turn re-resolves from the raw position.
        assert_eq!(r.resolve_index(0, 900, 4), 3);
        assert_eq!(r.resolve_index(0, 80, 4), 0);
    }
}
