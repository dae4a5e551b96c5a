// Everything the sequencer persists between sessions. Runtime handles are
// `#[serde(skip)]`ed and rebuilt by decoding the saved paths again.

use serde::{Deserialize, Serialize};

use crate::audio::SampleId;
use crate::pipeline::bank::SampleBank;
use crate::pipeline::effects::EffectSettings;
use crate::pipeline::grid::StepGrid;
use crate::shared::{DEFAULT_BPM, DEFAULT_VOLUME, MAX_BPM, MIN_BPM, NUM_TRACKS};

pub const NO_SAMPLE_NAME: &str = "No sample loaded";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackSettings {
    pub sample_path: String,
    pub sample_name: String,

    // We don't want to restore this on startup; it's a handle into the engine.
    #[serde(skip)]
    pub sample_id: Option<SampleId>,

    pub volume: f32, // 0.0 to 1.0
    pub effects: EffectSettings,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            sample_path: String::new(),
            sample_name: String::new(),
            sample_id: None,
            volume: DEFAULT_VOLUME,
            effects: EffectSettings::default(),
        }
    }
}

impl TrackSettings {
    pub fn is_loaded(&self) -> bool {
        self.sample_id.is_some()
    }

    pub fn display_name(&self) -> &str {
        if self.sample_name.is_empty() { NO_SAMPLE_NAME } else { &self.sample_name }
    }

    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = volume.clamp(0.0, 1.0);
        self.volume
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectState {
    pub tracks: [TrackSettings; NUM_TRACKS],
    pub grid: StepGrid,
    pub bpm: u32,
    pub bank: SampleBank,
}

impl ProjectState {
    /// Brings a state read from disk back inside the ranges the editor
    /// enforces: tempo, volumes, knobs and step counts.
    pub fn normalize(&mut self) {
        self.bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);
        for track in &mut self.tracks {
            let volume = track.volume;
            track.set_volume(volume);
            track.effects.normalize();
        }
        self.grid.normalize();
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            tracks: std::array::from_fn(|_| TrackSettings::default()),
            grid: StepGrid::default(),
            bpm: DEFAULT_BPM,
            bank: SampleBank::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_handles_are_not_serialized() {
        let mut state = ProjectState::default();
        state.tracks[0].sample_id = Some(crate::audio::next_sample_id());
        state.tracks[0].sample_name = "kick.wav".into();
        state.grid.toggle_step(0, 4);

        let json = serde_json::to_string(&state).unwrap();
        let back: ProjectState = serde_json::from_str(&json).unwrap();
        assert!(back.tracks[0].sample_id.is_none());
        assert_eq!(back.tracks[0].sample_name, "kick.wav");
        assert!(back.grid.is_set(0, 4));
        assert_eq!(back.bpm, DEFAULT_BPM);
    }

    #[test]
    fn normalize_pulls_hand_edited_values_back_in_range() {
        let mut state = ProjectState::default();
        state.bpm = 900;
        state.tracks[1].volume = 3.0;
        state.tracks[1].effects.delay.feedback = 2.0;
        state.tracks[1].effects.filter.cutoff = -1.0;
        state.normalize();
        assert_eq!(state.bpm, 200);
        assert_eq!(state.tracks[1].volume, 1.0);
        assert!((state.tracks[1].effects.delay.feedback - 0.9).abs() < 1e-6);
        assert_eq!(state.tracks[1].effects.filter.cutoff, 0.0);
    }

    #[test]
    fn volume_is_clamped() {
        let mut track = TrackSettings::default();
        assert_eq!(track.set_volume(1.3), 1.0);
        assert_eq!(track.set_volume(-0.1), 0.0);
        assert_eq!(track.display_name(), NO_SAMPLE_NAME);
    }
}
