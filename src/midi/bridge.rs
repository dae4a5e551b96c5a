use log::{error, info, warn};

use super::engine::{MidiEngine, MidiMessage, Result};

/// Only the first tracks map onto the Circuit Tracks drum channels.
pub const MIDI_TRACKS: usize = 4;

const FIRST_NOTE: u8 = 36;
const FIRST_CHANNEL: u8 = 9;
const AUTO_SELECT_NAME: &str = "circuit tracks";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiNote {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

impl MidiNote {
    fn on(self) -> MidiMessage {
        MidiMessage::NoteOn { channel: self.channel, note: self.note, velocity: self.velocity }
    }

    fn off(self) -> MidiMessage {
        MidiMessage::NoteOff { channel: self.channel, note: self.note }
    }
}

pub fn velocity_for_volume(volume: f32) -> u8 {
    (volume.clamp(0.0, 1.0) * 127.0).round() as u8
}

pub fn note_for_track(track: usize, volume: f32) -> Option<MidiNote> {
    if track >= MIDI_TRACKS {
        return None;
    }
    Some(MidiNote {
        channel: FIRST_CHANNEL + track as u8,
        note: FIRST_NOTE + track as u8,
        velocity: velocity_for_volume(volume),
    })
}

#[derive(Clone, Copy, Debug)]
struct PendingOff {
    track: usize,
    note: MidiNote,
    due: f64,
}

/// Forwards track triggers to the selected output. Every engine call is
/// caught here: failures are logged and never reach the sequencer.
pub struct MidiBridge {
    engine: Box<dyn MidiEngine>,
    // last port scan; enumerating ports opens a client, so not per frame
    outputs: Vec<String>,
    pending: Vec<PendingOff>,
}

impl MidiBridge {
    pub fn new(engine: Box<dyn MidiEngine>) -> Self {
        let outputs = engine.list_outputs();
        Self { engine, outputs, pending: Vec::new() }
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Rescans the ports. Called whenever the selection changes.
    pub fn refresh_outputs(&mut self) -> &[String] {
        self.outputs = self.engine.list_outputs();
        &self.outputs
    }

    pub fn selected(&self) -> Option<&str> {
        self.engine.connected_output()
    }

    pub fn pending_note_offs(&self) -> usize {
        self.pending.len()
    }

    /// `None` deselects. Outstanding notes are released on the old output
    /// first.
    pub fn select(&mut self, name: Option<&str>) -> Result<()> {
        self.flush_all();
        self.refresh_outputs();
        self.engine.disconnect_output();
        match name {
            Some(name) => self.engine.connect_output(name),
            None => Ok(()),
        }
    }

    /// Picks the first output that looks like a Circuit Tracks.
    pub fn auto_select(&mut self) -> Option<String> {
        let name = self
            .refresh_outputs()
            .iter()
            .find(|n| n.to_lowercase().contains(AUTO_SELECT_NAME))?
            .clone();
        match self.select(Some(&name)) {
            Ok(()) => {
                info!("auto-selected MIDI output '{}'", name);
                Some(name)
            }
            Err(e) => {
                warn!("could not auto-select '{}': {}", name, e);
                None
            }
        }
    }

    /// Steps through "no output" and then every output in turn.
    pub fn cycle_output(&mut self) -> Option<String> {
        let outputs = self.refresh_outputs().to_vec();
        let current = self
            .selected()
            .and_then(|s| outputs.iter().position(|o| o == s));
        let next = match current {
            None => outputs.first().cloned(),
            Some(i) => outputs.get(i + 1).cloned(),
        };
        if let Err(e) = self.select(next.as_deref()) {
            error!("MIDI output selection failed: {}", e);
            return None;
        }
        next
    }

    /// Note-on for an eligible track, with the matching note-off due at
    /// `at + length`. No-op without a selected output.
    pub fn trigger(&mut self, track: usize, volume: f32, at: f64, length: f64) {
        let Some(note) = note_for_track(track, volume) else {
            return;
        };
        if self.selected().is_none() {
            return;
        }
        // a retrigger closes the previous note first
        self.flush_track(track);
        if let Err(e) = self.engine.send(note.on()) {
            error!("MIDI output error: {}", e);
            return;
        }
        self.pending.push(PendingOff { track, note, due: at + length });
    }

    /// Sends every note-off due at or before `now`.
    pub fn release_due(&mut self, now: f64) {
        let (due, keep): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = keep;
        for off in due {
            self.send_off(off);
        }
    }

    pub fn flush_track(&mut self, track: usize) {
        let (due, keep): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|p| p.track == track);
        self.pending = keep;
        for off in due {
            self.send_off(off);
        }
    }

    pub fn flush_all(&mut self) {
        for off in std::mem::take(&mut self.pending) {
            self.send_off(off);
        }
    }

    fn send_off(&mut self, off: PendingOff) {
        if let Err(e) = self.engine.send(off.note.off()) {
            error!("MIDI note-off for track {} failed: {}", off.track + 1, e);
        }
    }
}

impl Drop for MidiBridge {
    fn drop(&mut self) {
        self.flush_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MockMidiEngine;

    fn bridge_with(mock: &MockMidiEngine) -> MidiBridge {
        let mut bridge = MidiBridge::new(Box::new(mock.clone()));
        bridge.select(Some("Circuit Tracks MIDI")).unwrap();
        bridge
    }

    #[test]
    fn track_mapping_matches_the_drum_channels() {
        assert_eq!(note_for_track(0, 1.0), Some(MidiNote { channel: 9, note: 36, velocity: 127 }));
        assert_eq!(note_for_track(3, 0.5), Some(MidiNote { channel: 12, note: 39, velocity: 64 }));
        assert_eq!(note_for_track(4, 1.0), None);
    }

    #[test]
    fn note_off_follows_after_the_step_length() {
        let mock = MockMidiEngine::new(&["Circuit Tracks MIDI"]);
        let mut bridge = bridge_with(&mock);
        bridge.trigger(1, 0.8, 1.0, 0.125);
        assert_eq!(bridge.pending_note_offs(), 1);

        bridge.release_due(1.1);
        assert_eq!(mock.sent_messages().len(), 1);
        bridge.release_due(1.125);
        assert_eq!(
            mock.sent_messages(),
            vec![
                MidiMessage::NoteOn { channel: 10, note: 37, velocity: 102 },
                MidiMessage::NoteOff { channel: 10, note: 37 },
            ]
        );
        assert_eq!(bridge.pending_note_offs(), 0);
    }

    #[test]
    fn nothing_is_sent_without_an_output() {
        let mock = MockMidiEngine::new(&["Circuit Tracks MIDI"]);
        let mut bridge = MidiBridge::new(Box::new(mock.clone()));
        bridge.trigger(0, 1.0, 0.0, 0.125);
        assert!(mock.sent_messages().is_empty());
        assert_eq!(bridge.pending_note_offs(), 0);
    }

    #[test]
    fn failed_sends_leave_no_pending_note() {
        let mock = MockMidiEngine::new(&["Circuit Tracks MIDI"]);
        let mut bridge = bridge_with(&mock);
        mock.set_failing(true);
        bridge.trigger(0, 1.0, 0.0, 0.125);
        assert_eq!(bridge.pending_note_offs(), 0);
    }

    #[test]
    fn flushing_a_track_only_releases_its_note() {
        let mock = MockMidiEngine::new(&["Circuit Tracks MIDI"]);
        let mut bridge = bridge_with(&mock);
        bridge.trigger(0, 1.0, 0.0, 0.125);
        bridge.trigger(2, 1.0, 0.0, 0.125);
        bridge.flush_track(2);
        assert_eq!(mock.sent_messages().last(), Some(&MidiMessage::NoteOff { channel: 11, note: 38 }));
        assert_eq!(bridge.pending_note_offs(), 1);
    }

    #[test]
    fn auto_select_matches_case_insensitively() {
        let mock = MockMidiEngine::new(&["IAC Bus 1", "Novation CIRCUIT TRACKS"]);
        let mut bridge = MidiBridge::new(Box::new(mock));
        assert_eq!(bridge.auto_select().as_deref(), Some("Novation CIRCUIT TRACKS"));
        assert_eq!(bridge.selected(), Some("Novation CIRCUIT TRACKS"));
    }

    #[test]
    fn outputs_are_scanned_on_selection_not_on_read() {
        let mock = MockMidiEngine::new(&["A"]);
        let mut bridge = MidiBridge::new(Box::new(mock.clone()));
        assert_eq!(mock.list_count(), 1);
        for _ in 0..60 {
            assert_eq!(bridge.outputs(), ["A".to_string()]);
        }
        assert_eq!(mock.list_count(), 1);

        bridge.cycle_output();
        assert!(mock.list_count() > 1);
    }

    #[test]
    fn cycling_passes_through_no_output() {
        let mock = MockMidiEngine::new(&["A", "B"]);
        let mut bridge = MidiBridge::new(Box::new(mock));
        assert_eq!(bridge.cycle_output().as_deref(), Some("A"));
        assert_eq!(bridge.cycle_output().as_deref(), Some("B"));
        assert_eq!(bridge.cycle_output(), None);
        assert_eq!(bridge.selected(), None);
        assert_eq!(bridge.cycle_output().as_deref(), Some("A"));
    }
}
