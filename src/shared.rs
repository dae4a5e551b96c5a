// Keybinds (resolved by the tui into the semantic events below):
//
// Everywhere:
//   Space         //  TogglePlayback (global transport)
//   Tab           //  cycle focus: grid -> bank -> library
//   { / }         //  AdjustTempo(-1 / +1)
//   o             //  CycleMidiOutput
//   e             //  ExportBank
//   S / L         //  SaveProject / LoadProject
//   X             //  ClearAll
//   Esc           //  Quit
//
// Grid focus (cursor = track x step):
//   arrows        //  move the cursor
//   Enter         //  ToggleStep
//   c             //  SetStepCount (cycles 4 -> 8 -> 12 -> 16)
//   p             //  ToggleTrackPlayback (solo transport)
//   m             //  ToggleMute
//   , / .         //  AdvanceStep(Backward / Forward)
//   f             //  next param page
//   [ / ]         //  knob A -/+
//   - / =         //  knob B -/+
//
// Bank focus (cursor = row x col):
//   arrows, Enter = preview, a = assign to the grid cursor's track, d = clear
//
// Library focus (files found in the project dir):
//   up/down, Enter = load onto the grid cursor's track, b = load into the bank cursor's slot
//
// The middle layer owns every bit of sequencer state; the tui only renders the
// DisplayState snapshot it gets each frame.

use crate::pipeline::effects::{EffectParam, EffectSettings};
use crate::sequencer::{ClockOwner, Direction};

pub const NUM_TRACKS: usize = 8;
pub const STEPS_PER_TRACK: usize = 16;
pub const STEP_COUNTS: [usize; 4] = [4, 8, 12, 16];
pub const BANK_ROWS: usize = 4;
pub const BANK_COLS: usize = 8;

pub const MIN_BPM: u32 = 60;
pub const MAX_BPM: u32 = 200;
pub const DEFAULT_BPM: u32 = 120;

pub const DEFAULT_VOLUME: f32 = 0.8;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // transport
    TogglePlayback,
    ToggleTrackPlayback(usize),
    ToggleMute(usize),
    AdvanceStep { track: usize, direction: Direction },
    AdjustTempo(i32),

    // grid
    ToggleStep { track: usize, step: usize },
    SetStepCount { track: usize, count: usize },
    ClearAll,

    // knobs
    AdjustVolume { track: usize, delta: f32 },
    AdjustEffect { track: usize, param: EffectParam, delta: f32 },

    // samples; `file` indexes DisplayState::library
    LoadTrackFromLibrary { track: usize, file: usize },
    LoadBankFromLibrary { row: usize, col: usize, file: usize },
    ClearBankSlot { row: usize, col: usize },
    PreviewBankSlot { row: usize, col: usize },
    AssignBankToTrack { row: usize, col: usize, track: usize },
    ExportBank,

    // midi
    CycleMidiOutput,

    // project
    SaveProject,
    LoadProject,

    Quit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MidiStatus {
    Unavailable(String), // audio-only mode, shown as a banner
    NoOutput,
    Connected(String),
}

#[derive(Clone, Debug)]
pub struct TrackView {
    pub name: String,
    pub loaded: bool,
    pub volume: f32,
    pub step_count: usize,
    pub steps: [bool; STEPS_PER_TRACK],
    pub current_step: Option<usize>,
    pub owner: ClockOwner,
    pub solo_running: bool,
    pub effects: EffectSettings,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub tracks: Vec<TrackView>,
    pub playing: bool,
    pub global_step: Option<usize>,
    pub bpm: u32,
    pub bank: [[String; BANK_COLS]; BANK_ROWS],
    pub midi: MidiStatus,
    pub midi_outputs: Vec<String>,
    pub library: Vec<String>,
    pub status: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamPage {
    Filter,
    Delay,
    Reverb,
    Mix,
}

// Knob A/B on each page; None means the knob drives the track volume.
impl ParamPage {
    pub fn next(self) -> Self {
        match self {
            ParamPage::Filter => ParamPage::Delay,
            ParamPage::Delay => ParamPage::Reverb,
            ParamPage::Reverb => ParamPage::Mix,
            ParamPage::Mix => ParamPage::Filter,
        }
    }

    pub fn knobs(self) -> (Option<EffectParam>, Option<EffectParam>) {
        match self {
            ParamPage::Filter => (Some(EffectParam::FilterCutoff), Some(EffectParam::FilterResonance)),
            ParamPage::Delay => (Some(EffectParam::DelayTime), Some(EffectParam::DelayFeedback)),
            ParamPage::Reverb => (Some(EffectParam::ReverbSize), Some(EffectParam::ReverbMix)),
            ParamPage::Mix => (None, Some(EffectParam::DelayMix)),
        }
    }

    pub fn knob_labels(self) -> (&'static str, &'static str) {
        let (a, b) = self.knobs();
        (
            a.map_or("VOLUME", EffectParam::label),
            b.map_or("VOLUME", EffectParam::label),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_pages_cycle_back_to_filter() {
        let mut page = ParamPage::Filter;
        for _ in 0..4 {
            page = page.next();
        }
        assert_eq!(page, ParamPage::Filter);
    }

    #[test]
    fn mix_page_drives_volume_on_knob_a() {
        assert_eq!(ParamPage::Mix.knob_labels(), ("VOLUME", "DLY MIX"));
        assert_eq!(ParamPage::Filter.knob_labels(), ("CUTOFF", "RESO"));
    }
}
