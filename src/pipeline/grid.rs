use serde::{Deserialize, Serialize};

use crate::shared::{NUM_TRACKS, STEPS_PER_TRACK, STEP_COUNTS};

/// Track x step on/off cells plus the per-track active step count.
///
/// The count only limits which cells are playable. Cells past it keep their
/// stored value and come back into play when the count is raised again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepGrid {
    cells: [[bool; STEPS_PER_TRACK]; NUM_TRACKS],
    step_counts: [usize; NUM_TRACKS],
}

impl Default for StepGrid {
    fn default() -> Self {
        Self {
            cells: [[false; STEPS_PER_TRACK]; NUM_TRACKS],
            step_counts: [STEPS_PER_TRACK; NUM_TRACKS],
        }
    }
}

impl StepGrid {
    /// Flips a stored cell. Out-of-range indices are ignored.
    pub fn toggle_step(&mut self, track: usize, step: usize) {
        if let Some(cell) = self.cells.get_mut(track).and_then(|row| row.get_mut(step)) {
            *cell = !*cell;
        }
    }

    pub fn set_step(&mut self, track: usize, step: usize, on: bool) {
        if let Some(cell) = self.cells.get_mut(track).and_then(|row| row.get_mut(step)) {
            *cell = on;
        }
    }

    /// The stored value, whether or not the step is inside the active range.
    pub fn is_set(&self, track: usize, step: usize) -> bool {
        self.cells
            .get(track)
            .and_then(|row| row.get(step))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_playable(&self, track: usize, step: usize) -> bool {
        step < self.step_count(track) && self.is_set(track, step)
    }

    pub fn step_count(&self, track: usize) -> usize {
        self.step_counts.get(track).copied().unwrap_or(0)
    }

    /// Returns false (and changes nothing) for counts other than 4/8/12/16.
    pub fn set_step_count(&mut self, track: usize, count: usize) -> bool {
        if !STEP_COUNTS.contains(&count) {
            return false;
        }
        match self.step_counts.get_mut(track) {
            Some(slot) => {
                *slot = count;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, track: usize) -> [bool; STEPS_PER_TRACK] {
        self.cells.get(track).copied().unwrap_or([false; STEPS_PER_TRACK])
    }

    pub fn clear_all(&mut self) {
        for row in &mut self.cells {
            row.fill(false);
        }
    }

    /// Puts any count other than 4/8/12/16 back to 16. Needed for grids read
    /// from disk, which never went through `set_step_count`.
    pub fn normalize(&mut self) {
        for count in &mut self.step_counts {
            if !STEP_COUNTS.contains(count) {
                *count = STEPS_PER_TRACK;
            }
        }
    }
}

/// Next count in the 4 -> 8 -> 12 -> 16 -> 4 cycle.
pub fn next_step_count(count: usize) -> usize {
    let idx = STEP_COUNTS.iter().position(|&c| c == count).unwrap_or(STEP_COUNTS.len() - 1);
    STEP_COUNTS[(idx + 1) % STEP_COUNTS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_and_unflips() {
        let mut grid = StepGrid::default();
        grid.toggle_step(2, 5);
        assert!(grid.is_set(2, 5));
        assert!(grid.is_playable(2, 5));
        grid.toggle_step(2, 5);
        assert!(!grid.is_set(2, 5));
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let mut grid = StepGrid::default();
        grid.toggle_step(NUM_TRACKS, 0);
        grid.toggle_step(0, STEPS_PER_TRACK);
        assert_eq!(grid, StepGrid::default());
        assert!(!grid.is_playable(NUM_TRACKS, 0));
    }

    #[test]
    fn steps_past_the_count_are_inert_but_kept() {
        let mut grid = StepGrid::default();
        for step in 8..16 {
            grid.toggle_step(1, step);
        }
        assert!(grid.set_step_count(1, 8));
        for step in 8..16 {
            assert!(grid.is_set(1, step));
            assert!(!grid.is_playable(1, step));
        }

        assert!(grid.set_step_count(1, 16));
        for step in 8..16 {
            assert!(grid.is_playable(1, step));
        }
    }

    #[test]
    fn toggling_a_dormant_step_still_changes_storage() {
        let mut grid = StepGrid::default();
        grid.set_step_count(0, 4);
        grid.toggle_step(0, 10);
        assert!(grid.is_set(0, 10));
        assert!(!grid.is_playable(0, 10));
    }

    #[test]
    fn only_supported_counts_are_accepted() {
        let mut grid = StepGrid::default();
        assert!(!grid.set_step_count(0, 5));
        assert!(!grid.set_step_count(0, 0));
        assert!(!grid.set_step_count(NUM_TRACKS, 8));
        assert_eq!(grid.step_count(0), 16);
        for count in STEP_COUNTS {
            assert!(grid.set_step_count(0, count));
            assert_eq!(grid.step_count(0), count);
        }
    }

    #[test]
    fn clear_all_keeps_step_counts() {
        let mut grid = StepGrid::default();
        grid.set_step_count(3, 12);
        grid.toggle_step(3, 0);
        grid.clear_all();
        assert!(!grid.is_set(3, 0));
        assert_eq!(grid.step_count(3), 12);
    }

    #[test]
    fn normalize_resets_unsupported_counts() {
        let mut grid = StepGrid::default();
        grid.step_counts = [0, 8, 5, 12, 16, 4, 99, 16];
        grid.normalize();
        assert_eq!(grid.step_count(0), 16);
        assert_eq!(grid.step_count(1), 8);
        assert_eq!(grid.step_count(2), 16);
        assert_eq!(grid.step_count(5), 4);
        assert_eq!(grid.step_count(6), 16);
    }

    #[test]
    fn step_counts_cycle() {
        assert_eq!(next_step_count(4), 8);
        assert_eq!(next_step_count(16), 4);
        assert_eq!(next_step_count(7), 4);
    }
}
