use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::shared::{DisplayState, MidiStatus};

use super::grid::{draw_bank, draw_step_grid};
use super::mode::{Focus, TuiState};

const HELP: &str = "space play  tab focus  {/} tempo  p solo  m mute  ,/. step  c steps  f page  [ ] - = knobs  o midi  e export  S/L save/load  X clear  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // transport + midi
            Constraint::Length(10), // step grid
            Constraint::Length(3),  // knobs for the cursor track
            Constraint::Min(6),     // bank + library
            Constraint::Length(1),  // help
        ])
        .split(area);

    draw_header(frame, sections[0], state, blink_on);
    let grid_cursor = (ts.focus == Focus::Grid).then_some((ts.track, ts.step));
    draw_step_grid(frame, sections[1], &state.tracks, grid_cursor, blink_on);
    draw_knobs(frame, sections[2], state, ts);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(sections[3]);
    let bank_cursor = (ts.focus == Focus::Bank).then_some((ts.bank_row, ts.bank_col));
    draw_bank(frame, bottom[0], &state.bank, bank_cursor);
    draw_library(frame, bottom[1], state, ts);

    frame.render_widget(Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)), sections[4]);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let play = if state.playing {
        let style = if blink_on && state.global_step.is_some_and(|s| s % 4 == 0) {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default().fg(Color::Green)
        };
        Span::styled(" PLAYING ", style)
    } else {
        Span::styled(" STOPPED ", Style::default().fg(Color::Gray))
    };

    let midi = match &state.midi {
        // persistent banner while running audio-only
        MidiStatus::Unavailable(reason) => Span::styled(
            format!(" MIDI unavailable ({reason}), audio only "),
            Style::default().fg(Color::Black).bg(Color::Red),
        ),
        MidiStatus::NoOutput => Span::styled(
            format!(" MIDI: no output ({} found) ", state.midi_outputs.len()),
            Style::default().fg(Color::Yellow),
        ),
        MidiStatus::Connected(name) => Span::styled(format!(" MIDI: {name} "), Style::default().fg(Color::Cyan)),
    };

    let line = Line::from(vec![
        play,
        Span::styled(format!("  {} BPM  ", state.bpm), Style::default().add_modifier(Modifier::BOLD)),
        midi,
        Span::raw("  "),
        Span::styled(state.status.clone(), Style::default().fg(Color::White)),
    ]);
    let block = Block::default().borders(Borders::ALL).title(" Circuit Tracks ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_knobs(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let Some(track) = state.tracks.get(ts.track) else {
        return;
    };
    let (a, b) = ts.param_page.knobs();
    let value = |p: Option<crate::pipeline::effects::EffectParam>| match p {
        Some(param) => track.effects.get(param),
        None => track.volume,
    };
    let (label_a, label_b) = ts.param_page.knob_labels();

    let mut spans = vec![Span::styled(
        format!("track {} {:?}  ", ts.track + 1, ts.param_page),
        Style::default().fg(Color::Gray),
    )];
    for (label, v) in [(label_a, value(a)), (label_b, value(b))] {
        spans.push(Span::styled(format!("{label} "), Style::default().fg(Color::LightMagenta)));
        spans.push(Span::raw(format!("{} {:.2}   ", knob_bar(v), v)));
    }
    let block = Block::default().borders(Borders::ALL).title(" Knobs ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn knob_bar(value: f32) -> String {
    const WIDTH: usize = 10;
    let filled = ((value.clamp(0.0, 1.0) * WIDTH as f32).round() as usize).min(WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}

fn draw_library(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let first = ts.library_index.saturating_sub(visible.saturating_sub(1));
    let lines: Vec<Line> = if state.library.is_empty() {
        vec![Line::styled("no .wav/.mp3 files", Style::default().fg(Color::DarkGray))]
    } else {
        state
            .library
            .iter()
            .enumerate()
            .skip(first)
            .take(visible)
            .map(|(i, name)| {
                let selected = ts.focus == Focus::Library && i == ts.library_index;
                let style = if selected {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Line::styled(name.clone(), style)
            })
            .collect()
    };
    let block = Block::default().borders(Borders::ALL).title(" Library ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knob_bar_fills_with_the_value() {
        assert_eq!(knob_bar(0.0), "[----------]");
        assert_eq!(knob_bar(0.5), "[#####-----]");
        assert_eq!(knob_bar(2.0), "[##########]");
    }
}
