use crate::shared::{DisplayState, ParamPage, BANK_COLS, BANK_ROWS, NUM_TRACKS, STEPS_PER_TRACK};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Grid,
    Bank,
    Library,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Grid => Focus::Bank,
            Focus::Bank => Focus::Library,
            Focus::Library => Focus::Grid,
        }
    }
}

// state local to the tui: cursors and focus. Everything the sequencer owns is
// synced from DisplayState once per loop
#[derive(Clone, Debug)]
pub struct TuiState {
    pub focus: Focus,
    pub track: usize,
    pub step: usize,
    pub bank_row: usize,
    pub bank_col: usize,
    pub library_index: usize,
    pub param_page: ParamPage,
    // synced from DisplayState each frame
    pub step_counts: [usize; NUM_TRACKS],
    pub library_len: usize,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            focus: Focus::Grid,
            track: 0,
            step: 0,
            bank_row: 0,
            bank_col: 0,
            library_index: 0,
            param_page: ParamPage::Filter,
            step_counts: [STEPS_PER_TRACK; NUM_TRACKS],
            library_len: 0,
        }
    }
}

impl TuiState {
    pub fn sync(&mut self, ds: &DisplayState) {
        for (count, track) in self.step_counts.iter_mut().zip(&ds.tracks) {
            *count = track.step_count;
        }
        self.library_len = ds.library.len();
        if self.library_index >= self.library_len {
            self.library_index = self.library_len.saturating_sub(1);
        }
    }

    // arrow keys, clamped to whatever has focus
    pub fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let step = |v: usize, d: isize, len: usize| (v as isize + d).clamp(0, len as isize - 1) as usize;
        match self.focus {
            Focus::Grid => {
                self.track = step(self.track, d_row, NUM_TRACKS);
                self.step = step(self.step, d_col, STEPS_PER_TRACK);
            }
            Focus::Bank => {
                self.bank_row = step(self.bank_row, d_row, BANK_ROWS);
                self.bank_col = step(self.bank_col, d_col, BANK_COLS);
            }
            Focus::Library => {
                if self.library_len > 0 {
                    self.library_index = step(self.library_index, d_row, self.library_len);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_stay_inside_their_grids() {
        let mut ts = TuiState::default();
        ts.move_cursor(-1, -1);
        assert_eq!((ts.track, ts.step), (0, 0));
        for _ in 0..20 {
            ts.move_cursor(1, 1);
        }
        assert_eq!((ts.track, ts.step), (NUM_TRACKS - 1, STEPS_PER_TRACK - 1));

        ts.focus = Focus::Bank;
        for _ in 0..20 {
            ts.move_cursor(1, 1);
        }
        assert_eq!((ts.bank_row, ts.bank_col), (BANK_ROWS - 1, BANK_COLS - 1));
    }

    #[test]
    fn empty_library_keeps_the_cursor_at_zero() {
        let mut ts = TuiState { focus: Focus::Library, ..TuiState::default() };
        ts.move_cursor(1, 0);
        assert_eq!(ts.library_index, 0);
    }
}
