use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::sequencer::ClockOwner;
use crate::shared::{TrackView, BANK_COLS, STEPS_PER_TRACK};

const NAME_WIDTH: usize = 18;

// style for one cell of the step grid
fn step_style(track: &TrackView, step: usize, cursor: bool, blink_on: bool) -> Style {
    let playable = step < track.step_count;
    let playing_here = track.current_step == Some(step);
    let mut style = match (track.steps[step], playable) {
        (true, true) => Style::default().fg(Color::Black).bg(Color::LightMagenta),
        (true, false) => Style::default().fg(Color::DarkGray).bg(Color::Magenta), // stored, resting
        (false, true) => Style::default().fg(Color::Gray),
        (false, false) => Style::default().fg(Color::DarkGray),
    };
    if playing_here {
        style = style.bg(Color::Yellow).fg(Color::Black);
    }
    if cursor && blink_on {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn owner_tag(track: &TrackView) -> Span<'static> {
    match track.owner {
        ClockOwner::Global => Span::raw("   "),
        ClockOwner::Solo => Span::styled(" S ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        ClockOwner::Muted => Span::styled(" M ", Style::default().fg(Color::Black).bg(Color::Red)),
    }
}

pub fn draw_step_grid(
    frame: &mut Frame,
    area: Rect,
    tracks: &[TrackView],
    cursor: Option<(usize, usize)>,
    blink_on: bool,
) {
    let lines: Vec<Line> = tracks
        .iter()
        .enumerate()
        .map(|(t, track)| {
            let mut name: String = track.name.chars().take(NAME_WIDTH).collect();
            name = format!("{:>2} {:<width$}", t + 1, name, width = NAME_WIDTH);
            let name_style = if track.loaded {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let mut spans = vec![Span::styled(name, name_style), owner_tag(track)];
            for step in 0..STEPS_PER_TRACK {
                if step % 4 == 0 {
                    spans.push(Span::raw(" "));
                }
                let here = cursor == Some((t, step));
                spans.push(Span::styled(" \u{25a0} ", step_style(track, step, here, blink_on)));
            }
            spans.push(Span::styled(
                format!(" {:>2}/{} vol {:>3.0}%", track.step_count, STEPS_PER_TRACK, track.volume * 100.0),
                Style::default().fg(Color::Gray),
            ));
            Line::from(spans)
        })
        .collect();

    let block = Block::default().borders(Borders::ALL).title(" Tracks ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn draw_bank(frame: &mut Frame, area: Rect, bank: &[[String; BANK_COLS]], cursor: Option<(usize, usize)>) {
    let cell_width = (area.width.saturating_sub(2) as usize / BANK_COLS).clamp(4, 16);
    let lines: Vec<Line> = bank
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let spans: Vec<Span> = row
                .iter()
                .enumerate()
                .map(|(c, name)| {
                    let label: String = name.chars().take(cell_width - 1).collect();
                    let mut style = if name == crate::pipeline::bank::EMPTY_SLOT_NAME {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default().fg(Color::LightGreen)
                    };
                    if cursor == Some((r, c)) {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(format!("{:<width$}", label, width = cell_width), style)
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let block = Block::default().borders(Borders::ALL).title(" Sample bank ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
