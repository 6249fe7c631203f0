//! Dot-indicator pagination for knob positions.
//!
//! Purely a display aid: given the current index and the option count,
//! produces a bounded window of dot descriptors the presentation layer can
//! render below a filter. Never touches resolver state.

/// Maximum number of dots shown at once; larger option lists get a sliding
/// window that keeps the current index visible
pub const MAX_DOTS: usize = 5;

/// Visual weight of a single dot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotMode {
    /// The currently selected index
    Active,
    /// Directly adjacent to the selection
    Near,
    /// Two or more steps away
    Far,
}

/// One pagination frame for a single filter dimension
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationDescriptor {
    pub current_index: usize,
    pub total_options: usize,
    /// Index of the first dot within the full option list
    pub window_start: usize,
    pub dots: Vec<DotMode>,
}

/// Computes the dot window for `(current_index, total_options)`.
///
/// Up to [`MAX_DOTS`] options every dot is shown; beyond that a window of
/// [`MAX_DOTS`] dots slides so the active dot stays visible, biased to the
/// center of the window.
pub fn window(current_index: usize, total_options: usize) -> PaginationDescriptor {
    if total_options <= MAX_DOTS {
        let dots = (0..total_options)
            .map(|i| dot_mode(i, current_index))
            .collect();
        return PaginationDescriptor {
            current_index,
            total_options,
            window_start: 0,
            dots,
        };
    }

    let half = MAX_DOTS / 2;
    let mut start = current_index.saturating_sub(half);
    let end = (start + MAX_DOTS).min(total_options);
    if end - start < MAX_DOTS {
        start = end.saturating_sub(MAX_DOTS);
    }

    let dots = (start..end).map(|i| dot_mode(i, current_index)).collect();
    PaginationDescriptor {
        current_index,
        total_options,
        window_start: start,
        dots,
    }
}

fn dot_mode(index: usize, current_index: usize) -> DotMode {
    let distance = index.abs_diff(current_index);
    match distance {
        0 => DotMode::Active,
        1 => DotMode::Near,
        _ => DotMode::Far,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DotMode::{Active, Far, Near};

    #[test]
    fn small_totals_show_every_dot() {
        let descriptor = window(1, 3);
        assert_eq!(descriptor.window_start, 0);
        assert_eq!(descriptor.dots, vec![Near, Active, Near]);
    }

    #[test]
    fn modes_follow_distance() {
        let descriptor = window(0, 5);
        assert_eq!(descriptor.dots, vec![Active, Near, Far, Far, Far]);
    }

    #[test]
    fn large_totals_center_the_window() {
        let descriptor = window(6, 13);
        assert_eq!(descriptor.window_start, 4);
        assert_eq!(descriptor.dots.len(), MAX_DOTS);
        assert_eq!(descriptor.dots[2], Active);
    }

    #[test]
    fn window_clamps_at_the_low_edge() {
        let descriptor = window(0, 13);
        assert_eq!(descriptor.window_start, 0);
        assert_eq!(descriptor.dots, vec![Active, Near, Far, Far, Far]);
    }

    #[test]
    fn window_clamps_at_the_high_edge() {
        let descriptor = window(12, 13);
        assert_eq!(descriptor.window_start, 8);
        assert_eq!(descriptor.dots, vec![Far, Far, Far, Near, Active]);
    }

    #[test]
    fn empty_list_yields_no_dots() {
        let descriptor = window(0, 0);
        assert!(descriptor.dots.is_empty());
    }
}
