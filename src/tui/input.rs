use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::pipeline::grid::next_step_count;
use crate::sequencer::Direction;
use crate::shared::InputEvent;

use super::mode::{Focus, TuiState};

const KNOB_STEP: f32 = 0.05;

// poll for input from the tui, move cursors held in TuiState, and resolve key
// presses into semantic input events for the middle layer
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::TogglePlayback],
        KeyCode::Tab => {
            ts.focus = ts.focus.next();
            vec![]
        }
        KeyCode::Char('{') => vec![InputEvent::AdjustTempo(-1)],
        KeyCode::Char('}') => vec![InputEvent::AdjustTempo(1)],
        KeyCode::Char('o') => vec![InputEvent::CycleMidiOutput],
        KeyCode::Char('e') => vec![InputEvent::ExportBank],
        KeyCode::Char('S') => vec![InputEvent::SaveProject],
        KeyCode::Char('L') => vec![InputEvent::LoadProject],
        KeyCode::Char('X') => vec![InputEvent::ClearAll],

        KeyCode::Up => { ts.move_cursor(-1, 0); vec![] }
        KeyCode::Down => { ts.move_cursor(1, 0); vec![] }
        KeyCode::Left => { ts.move_cursor(0, -1); vec![] }
        KeyCode::Right => { ts.move_cursor(0, 1); vec![] }

        other => match ts.focus {
            Focus::Grid => resolve_grid(other, ts),
            Focus::Bank => resolve_bank(other, ts),
            Focus::Library => resolve_library(other, ts),
        },
    }
}

fn resolve_grid(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    let track = ts.track;
    match code {
        KeyCode::Enter => vec![InputEvent::ToggleStep { track, step: ts.step }],
        KeyCode::Char('c') => {
            let count = next_step_count(ts.step_counts[track]);
            vec![InputEvent::SetStepCount { track, count }]
        }
        KeyCode::Char('p') => vec![InputEvent::ToggleTrackPlayback(track)],
        KeyCode::Char('m') => vec![InputEvent::ToggleMute(track)],
        KeyCode::Char(',') => vec![InputEvent::AdvanceStep { track, direction: Direction::Backward }],
        KeyCode::Char('.') => vec![InputEvent::AdvanceStep { track, direction: Direction::Forward }],
        KeyCode::Char('f') => {
            ts.param_page = ts.param_page.next();
            vec![]
        }
        KeyCode::Char('[') => resolve_knob(true, -KNOB_STEP, ts),
        KeyCode::Char(']') => resolve_knob(true, KNOB_STEP, ts),
        KeyCode::Char('-') => resolve_knob(false, -KNOB_STEP, ts),
        KeyCode::Char('=') => resolve_knob(false, KNOB_STEP, ts),
        _ => vec![],
    }
}

// knob a or b on the current param page, for the cursor's track
fn resolve_knob(knob_a: bool, delta: f32, ts: &TuiState) -> Vec<InputEvent> {
    let (a, b) = ts.param_page.knobs();
    let track = ts.track;
    match if knob_a { a } else { b } {
        Some(param) => vec![InputEvent::AdjustEffect { track, param, delta }],
        None => vec![InputEvent::AdjustVolume { track, delta }],
    }
}

fn resolve_bank(code: KeyCode, ts: &TuiState) -> Vec<InputEvent> {
    let (row, col) = (ts.bank_row, ts.bank_col);
    match code {
        KeyCode::Enter => vec![InputEvent::PreviewBankSlot { row, col }],
        KeyCode::Char('a') => vec![InputEvent::AssignBankToTrack { row, col, track: ts.track }],
        KeyCode::Char('d') => vec![InputEvent::ClearBankSlot { row, col }],
        _ => vec![],
    }
}

fn resolve_library(code: KeyCode, ts: &TuiState) -> Vec<InputEvent> {
    if ts.library_len == 0 {
        return vec![];
    }
    let file = ts.library_index;
    match code {
        KeyCode::Enter => vec![InputEvent::LoadTrackFromLibrary { track: ts.track, file }],
        KeyCode::Char('b') => vec![InputEvent::LoadBankFromLibrary { row: ts.bank_row, col: ts.bank_col, file }],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::effects::EffectParam;
    use crate::shared::ParamPage;

    #[test]
    fn enter_means_something_different_per_focus() {
        let mut ts = TuiState::default();
        ts.move_cursor(2, 3);
        assert_eq!(handle_key(KeyCode::Enter, &mut ts), vec![InputEvent::ToggleStep { track: 2, step: 3 }]);

        handle_key(KeyCode::Tab, &mut ts);
        assert_eq!(handle_key(KeyCode::Enter, &mut ts), vec![InputEvent::PreviewBankSlot { row: 0, col: 0 }]);
        assert_eq!(
            handle_key(KeyCode::Char('a'), &mut ts),
            vec![InputEvent::AssignBankToTrack { row: 0, col: 0, track: 2 }]
        );

        handle_key(KeyCode::Tab, &mut ts);
        assert!(handle_key(KeyCode::Enter, &mut ts).is_empty()); // nothing in the library
        ts.library_len = 3;
        assert_eq!(
            handle_key(KeyCode::Enter, &mut ts),
            vec![InputEvent::LoadTrackFromLibrary { track: 2, file: 0 }]
        );
    }

    #[test]
    fn step_count_key_cycles_from_the_synced_count() {
        let mut ts = TuiState::default();
        ts.step_counts[0] = 8;
        assert_eq!(
            handle_key(KeyCode::Char('c'), &mut ts),
            vec![InputEvent::SetStepCount { track: 0, count: 12 }]
        );
    }

    #[test]
    fn knobs_follow_the_param_page() {
        let mut ts = TuiState::default();
        assert_eq!(
            handle_key(KeyCode::Char(']'), &mut ts),
            vec![InputEvent::AdjustEffect { track: 0, param: EffectParam::FilterCutoff, delta: KNOB_STEP }]
        );
        ts.param_page = ParamPage::Mix;
        assert_eq!(
            handle_key(KeyCode::Char('['), &mut ts),
            vec![InputEvent::AdjustVolume { track: 0, delta: -KNOB_STEP }]
        );
    }
}
