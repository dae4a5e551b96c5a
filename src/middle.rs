// The state container. Owns the project, the transport and the MIDI bridge;
// turns input events, clock ticks and worker results into audio commands.
// Nothing here blocks: decoding and reverb generation go out as jobs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::audio::{SampleBuffer, SampleId, TrackChain};
use crate::audio_api::{AudioCommand, Route, TriggerParams};
use crate::loader::sample_loader;
use crate::loader::worker::{Decoded, Job, JobResult};
use crate::midi::{MidiBridge, TransportSignal};
use crate::pipeline::effects::{reverb_decay_secs, EffectParam};
use crate::pipeline::persistence;
use crate::pipeline::project::ProjectState;
use crate::pipeline::store::SampleStore;
use crate::sequencer::{ClockOwner, Direction, StepTrigger, Transport};
use crate::shared::{
    DisplayState, InputEvent, MidiStatus, TrackView, BANK_COLS, BANK_ROWS, NUM_TRACKS,
};

const PREVIEW_GAIN: f32 = 1.0;

// Longest gap one tick will catch up on. Anything past it (a suspended
// laptop, a blocked terminal) is dropped instead of fired as a burst.
const MAX_TICK_SECS: f64 = 0.25;

pub struct Middle {
    pub state: ProjectState,
    transport: Transport,
    store: SampleStore,
    midi: Option<MidiBridge>,
    midi_unavailable: Option<String>,
    sample_rate: u32,
    project_dir: PathBuf,
    library: Vec<PathBuf>,
    jobs: Vec<Job>,
    chain_built: [bool; NUM_TRACKS],
    reverb_generation: [u64; NUM_TRACKS],
    session: u64, // bumped on project load; older decodes are dropped
    status: String,
}

impl Middle {
    pub fn new(state: ProjectState, sample_rate: u32, project_dir: &Path) -> Self {
        let transport = Transport::new(state.bpm);
        let mut middle = Self {
            state,
            transport,
            store: SampleStore::default(),
            midi: None,
            midi_unavailable: None,
            sample_rate,
            project_dir: project_dir.to_path_buf(),
            library: Vec::new(),
            jobs: Vec::new(),
            chain_built: [false; NUM_TRACKS],
            reverb_generation: [0; NUM_TRACKS],
            session: 0,
            status: String::new(),
        };
        middle.state.bpm = middle.transport.bpm();
        middle
    }

    pub fn attach_midi(&mut self, bridge: MidiBridge) {
        self.midi = Some(bridge);
        self.midi_unavailable = None;
    }

    /// Audio-only mode; `reason` stays on screen as a banner.
    pub fn midi_unavailable(&mut self, reason: &str) {
        warn!("running audio-only: {}", reason);
        self.midi = None;
        self.midi_unavailable = Some(reason.to_string());
    }

    pub fn midi(&self) -> Option<&MidiBridge> {
        self.midi.as_ref()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = msg.into();
    }

    pub fn library(&self) -> &[PathBuf] {
        &self.library
    }

    pub fn refresh_library(&mut self) {
        match sample_loader::index_samples_in_dir(&self.project_dir) {
            Ok(paths) => self.library = paths,
            Err(e) => {
                warn!("could not index {}: {}", self.project_dir.display(), e);
                self.library.clear();
            }
        }
    }

    /// Jobs queued since the last call, for the worker.
    pub fn take_jobs(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.jobs)
    }

    /// Queues a decode for every saved sample path that still exists.
    pub fn restore_samples(&mut self) {
        for track in 0..NUM_TRACKS {
            let path = self.state.tracks[track].sample_path.clone();
            if path.is_empty() {
                continue;
            }
            if Path::new(&path).exists() {
                self.jobs.push(Job::DecodeTrack { session: self.session, track, path: PathBuf::from(path) });
            } else {
                warn!("track {} sample {} is gone", track + 1, path);
                let settings = &mut self.state.tracks[track];
                settings.sample_path.clear();
                settings.sample_name.clear();
            }
        }
        for row in 0..BANK_ROWS {
            for col in 0..BANK_COLS {
                let Some(slot) = self.state.bank.slot(row, col) else { continue };
                if slot.sample_path.is_empty() {
                    continue;
                }
                let path = PathBuf::from(&slot.sample_path);
                if path.exists() {
                    self.jobs.push(Job::DecodeBank { session: self.session, row, col, path });
                } else {
                    warn!("bank sample {} is gone", path.display());
                    self.state.bank.clear(row, col);
                }
            }
        }
    }

    // ── Input ─────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<AudioCommand> {
        debug!("input: {:?}", event);
        match event {
            InputEvent::TogglePlayback => {
                self.toggle_playback();
                vec![]
            }
            InputEvent::ToggleTrackPlayback(track) => {
                self.toggle_track_playback(track);
                vec![]
            }
            InputEvent::ToggleMute(track) => {
                self.toggle_mute(track);
                vec![]
            }
            InputEvent::AdvanceStep { track, direction } => self.advance_step(track, direction),
            InputEvent::AdjustTempo(delta) => {
                self.adjust_tempo(delta);
                vec![]
            }
            InputEvent::ToggleStep { track, step } => {
                self.state.grid.toggle_step(track, step);
                vec![]
            }
            InputEvent::SetStepCount { track, count } => {
                self.state.grid.set_step_count(track, count);
                vec![]
            }
            InputEvent::ClearAll => {
                self.state.grid.clear_all();
                self.set_status("Cleared all steps");
                vec![]
            }
            InputEvent::AdjustVolume { track, delta } => {
                self.adjust_volume(track, delta);
                vec![]
            }
            InputEvent::AdjustEffect { track, param, delta } => self.adjust_effect(track, param, delta),
            InputEvent::LoadTrackFromLibrary { track, file } => {
                if let Some(path) = self.library.get(file).cloned() {
                    self.load_track_sample(track, &path);
                }
                vec![]
            }
            InputEvent::LoadBankFromLibrary { row, col, file } => {
                if let Some(path) = self.library.get(file).cloned() {
                    self.load_bank_sample(row, col, &path);
                }
                vec![]
            }
            InputEvent::ClearBankSlot { row, col } => self.clear_bank_slot(row, col),
            InputEvent::PreviewBankSlot { row, col } => self.preview_bank_slot(row, col),
            InputEvent::AssignBankToTrack { row, col, track } => self.assign_bank_to_track(row, col, track),
            InputEvent::ExportBank => {
                self.export_bank();
                vec![]
            }
            InputEvent::CycleMidiOutput => {
                self.cycle_midi_output();
                vec![]
            }
            InputEvent::SaveProject => {
                self.save_project();
                vec![]
            }
            InputEvent::LoadProject => self.load_project(),
            InputEvent::Quit => vec![],
        }
    }

    // ── Transport ─────────────────────────────────────────────────

    pub fn toggle_playback(&mut self) {
        if self.transport.is_playing() {
            self.stop_playback();
        } else {
            self.transport.start();
            info!("transport started at {} bpm", self.transport.bpm());
        }
    }

    fn stop_playback(&mut self) {
        self.transport.stop();
        if let Some(midi) = self.midi.as_mut() {
            for track in 0..NUM_TRACKS {
                if self.transport.owner(track) == ClockOwner::Global {
                    midi.flush_track(track);
                }
            }
        }
        info!("transport stopped");
    }

    pub fn on_transport_signal(&mut self, signal: TransportSignal) {
        match signal {
            TransportSignal::Start if !self.transport.is_playing() => self.toggle_playback(),
            TransportSignal::Stop if self.transport.is_playing() => self.stop_playback(),
            _ => {}
        }
    }

    pub fn toggle_track_playback(&mut self, track: usize) {
        if track >= NUM_TRACKS {
            return;
        }
        if self.transport.is_track_running(track) {
            self.transport.stop_track(track);
        } else {
            self.transport.start_track(track);
        }
        self.flush_midi_track(track);
    }

    pub fn toggle_mute(&mut self, track: usize) {
        if track >= NUM_TRACKS {
            return;
        }
        let muted = self.transport.owner(track) == ClockOwner::Muted;
        self.transport.set_muted(track, !muted);
        self.flush_midi_track(track);
    }

    fn flush_midi_track(&mut self, track: usize) {
        if let Some(midi) = self.midi.as_mut() {
            midi.flush_track(track);
        }
    }

    pub fn advance_step(&mut self, track: usize, direction: Direction) -> Vec<AudioCommand> {
        let now = self.transport.now();
        self.release_midi(now);
        match self.transport.advance_step(track, direction, &self.state.grid) {
            Some(trigger) => self.play_step(trigger).into_iter().collect(),
            None => vec![],
        }
    }

    pub fn adjust_tempo(&mut self, delta: i32) -> u32 {
        let requested = (self.transport.bpm() as i64 + delta as i64).max(0) as u32;
        self.state.bpm = self.transport.set_bpm(requested);
        self.state.bpm
    }

    /// Runs the clocks forward and returns the triggers that came due.
    pub fn tick(&mut self, elapsed: f64) -> Vec<AudioCommand> {
        if elapsed > MAX_TICK_SECS {
            warn!("main loop stalled for {:.2}s, skipping missed steps", elapsed);
        }
        let elapsed = elapsed.clamp(0.0, MAX_TICK_SECS);
        let due = self.transport.advance(elapsed, &self.state.grid);
        let mut cmds = Vec::with_capacity(due.len());
        for trigger in due {
            self.release_midi(trigger.at);
            cmds.extend(self.play_step(trigger));
        }
        let now = self.transport.now();
        self.release_midi(now);
        cmds
    }

    fn release_midi(&mut self, now: f64) {
        if let Some(midi) = self.midi.as_mut() {
            midi.release_due(now);
        }
    }

    // one playable step: sample through the track chain, note to MIDI
    fn play_step(&mut self, trigger: StepTrigger) -> Option<AudioCommand> {
        let settings = self.state.tracks.get(trigger.track)?;
        let volume = settings.volume;
        if let Some(midi) = self.midi.as_mut() {
            midi.trigger(trigger.track, volume, trigger.at, self.transport.step_duration());
        }
        let sample_id = settings.sample_id?;
        Some(AudioCommand::Trigger(TriggerParams {
            route: Route::Track(trigger.track),
            sample_id,
            gain: volume,
        }))
    }

    // ── Knobs ─────────────────────────────────────────────────────

    pub fn adjust_volume(&mut self, track: usize, delta: f32) {
        if let Some(settings) = self.state.tracks.get_mut(track) {
            let volume = settings.volume + delta;
            settings.set_volume(volume);
        }
    }

    pub fn adjust_effect(&mut self, track: usize, param: EffectParam, delta: f32) -> Vec<AudioCommand> {
        let Some(settings) = self.state.tracks.get_mut(track) else {
            return vec![];
        };
        let current = settings.effects.get(param);
        let value = settings.effects.set(param, current + delta);
        let mix = settings.effects.reverb.mix;
        if !self.chain_built[track] {
            return vec![]; // picked up when the chain gets built
        }
        match param.to_chain_param(value) {
            Some(param) => vec![AudioCommand::SetParam { track, param }],
            None => {
                self.reverb_generation[track] += 1;
                self.jobs.push(Job::GenerateReverb {
                    track,
                    generation: self.reverb_generation[track],
                    decay_secs: reverb_decay_secs(value),
                    mix,
                });
                vec![]
            }
        }
    }

    fn build_chain(&mut self, track: usize) -> AudioCommand {
        let params = self.state.tracks[track].effects.to_chain_params();
        self.chain_built[track] = true;
        // any regeneration still in flight was made for the old chain
        self.reverb_generation[track] += 1;
        AudioCommand::InstallChain {
            track,
            chain: Box::new(TrackChain::new(&params, self.sample_rate as f32)),
        }
    }

    // ── Samples ───────────────────────────────────────────────────

    pub fn load_track_sample(&mut self, track: usize, path: &Path) {
        if track >= NUM_TRACKS {
            return;
        }
        if !sample_loader::is_supported(path) {
            self.set_status(format!("{} is not a .wav or .mp3 file", sample_loader::file_name(path)));
            return;
        }
        self.set_status(format!("Loading {}...", sample_loader::file_name(path)));
        self.jobs.push(Job::DecodeTrack { session: self.session, track, path: path.to_path_buf() });
    }

    pub fn load_bank_sample(&mut self, row: usize, col: usize, path: &Path) {
        if row >= BANK_ROWS || col >= BANK_COLS {
            return;
        }
        if !sample_loader::is_supported(path) {
            self.set_status(format!("{} is not a .wav or .mp3 file", sample_loader::file_name(path)));
            return;
        }
        self.set_status(format!("Loading {}...", sample_loader::file_name(path)));
        self.jobs.push(Job::DecodeBank { session: self.session, row, col, path: path.to_path_buf() });
    }

    /// Installs a decoded buffer on a track: the old buffer is released, the
    /// new one registered and the track's chain rebuilt.
    pub fn install_track_sample(
        &mut self,
        track: usize,
        path: &Path,
        id: SampleId,
        buffer: Arc<SampleBuffer>,
    ) -> Vec<AudioCommand> {
        if track >= NUM_TRACKS {
            return vec![];
        }
        let mut cmds = Vec::with_capacity(3);
        if let Some(old) = self.state.tracks[track].sample_id.take() {
            cmds.push(self.store.release(old));
        }
        cmds.push(self.store.register(id, buffer));
        let name = sample_loader::file_name(path);
        let settings = &mut self.state.tracks[track];
        settings.sample_id = Some(id);
        settings.sample_path = path.to_string_lossy().into_owned();
        settings.sample_name = name.clone();
        cmds.push(self.build_chain(track));
        info!("track {} <- {}", track + 1, name);
        self.set_status(format!("Loaded {} on track {}", name, track + 1));
        cmds
    }

    fn install_bank_sample(
        &mut self,
        row: usize,
        col: usize,
        path: &Path,
        id: SampleId,
        buffer: Arc<SampleBuffer>,
    ) -> Vec<AudioCommand> {
        let name = sample_loader::file_name(path);
        let path_str = path.to_string_lossy();
        if row >= BANK_ROWS || col >= BANK_COLS {
            return vec![];
        }
        let mut cmds = Vec::with_capacity(2);
        if let Some(old) = self.state.bank.install(row, col, &name, &path_str, id) {
            cmds.push(self.store.release(old));
        }
        cmds.push(self.store.register(id, buffer));
        self.set_status(format!("Loaded {} into bank slot {}-{}", name, row + 1, col + 1));
        cmds
    }

    pub fn on_job_result(&mut self, result: JobResult) -> Vec<AudioCommand> {
        match result {
            JobResult::Track { session, path, .. } | JobResult::Bank { session, path, .. }
                if session != self.session =>
            {
                debug!("discarding decode of {} from an earlier project", path.display());
                vec![]
            }
            JobResult::Track { track, path, decoded, .. } => match decoded {
                Decoded::Ok { id, buffer } => self.install_track_sample(track, &path, id, buffer),
                Decoded::Failed(reason) => {
                    self.set_status(format!("Failed to load {}: {}", sample_loader::file_name(&path), reason));
                    vec![]
                }
            },
            JobResult::Bank { row, col, path, decoded, .. } => match decoded {
                Decoded::Ok { id, buffer } => self.install_bank_sample(row, col, &path, id, buffer),
                Decoded::Failed(reason) => {
                    self.set_status(format!("Failed to load {}: {}", sample_loader::file_name(&path), reason));
                    vec![]
                }
            },
            JobResult::Reverb { track, generation, reverb } => {
                let current = self.reverb_generation.get(track).copied();
                if current != Some(generation) || !self.chain_built[track] {
                    debug!("discarding stale reverb for track {} (gen {})", track + 1, generation);
                    return vec![];
                }
                vec![AudioCommand::ReplaceReverb { track, reverb }]
            }
        }
    }

    pub fn clear_bank_slot(&mut self, row: usize, col: usize) -> Vec<AudioCommand> {
        match self.state.bank.clear(row, col) {
            Some(id) => vec![self.store.release(id)],
            None => vec![],
        }
    }

    pub fn preview_bank_slot(&mut self, row: usize, col: usize) -> Vec<AudioCommand> {
        let Some(sample_id) = self.state.bank.slot(row, col).and_then(|s| s.sample_id) else {
            return vec![];
        };
        vec![AudioCommand::Trigger(TriggerParams {
            route: Route::Direct,
            sample_id,
            gain: PREVIEW_GAIN,
        })]
    }

    /// Copies a bank slot onto a track. The slot keeps its own sample.
    pub fn assign_bank_to_track(&mut self, row: usize, col: usize, track: usize) -> Vec<AudioCommand> {
        if track >= NUM_TRACKS {
            return vec![];
        }
        let Some(slot) = self.state.bank.slot(row, col).filter(|s| s.is_loaded()).cloned() else {
            return vec![];
        };
        let Some(source) = slot.sample_id else {
            return vec![];
        };
        let Some((copy, register)) = self.store.duplicate(source) else {
            error!("bank slot {}-{} has no buffer behind it", row + 1, col + 1);
            return vec![];
        };

        let mut cmds = Vec::with_capacity(3);
        if let Some(old) = self.state.tracks[track].sample_id.take() {
            cmds.push(self.store.release(old));
        }
        cmds.push(register);
        let settings = &mut self.state.tracks[track];
        settings.sample_id = Some(copy);
        settings.sample_path = slot.sample_path.clone();
        settings.sample_name = slot.name.clone();
        cmds.push(self.build_chain(track));
        self.set_status(format!("Assigned {} to track {}", slot.name, track + 1));
        cmds
    }

    pub fn export_bank(&mut self) -> Option<PathBuf> {
        match persistence::export_bank(&self.project_dir, &self.state.bank) {
            Ok(path) => {
                self.set_status(format!("Exported bank to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                error!("bank export failed: {:#}", e);
                self.set_status(format!("Bank export failed: {e}"));
                None
            }
        }
    }

    // ── MIDI ──────────────────────────────────────────────────────

    pub fn cycle_midi_output(&mut self) {
        let Some(midi) = self.midi.as_mut() else {
            return;
        };
        let selected = midi.cycle_output();
        self.set_status(match selected {
            Some(name) => format!("MIDI output: {name}"),
            None => "MIDI output: none".to_string(),
        });
    }

    pub fn midi_status(&self) -> MidiStatus {
        if let Some(reason) = &self.midi_unavailable {
            return MidiStatus::Unavailable(reason.clone());
        }
        match self.midi.as_ref().and_then(|m| m.selected()) {
            Some(name) => MidiStatus::Connected(name.to_string()),
            None => MidiStatus::NoOutput,
        }
    }

    // ── Project ───────────────────────────────────────────────────

    pub fn save_project(&mut self) -> Option<PathBuf> {
        match persistence::save_project(&self.project_dir, &self.state) {
            Ok(path) => {
                self.set_status("Project saved");
                Some(path)
            }
            Err(e) => {
                error!("save failed: {:#}", e);
                self.set_status(format!("Save failed: {e}"));
                None
            }
        }
    }

    /// Replaces the session with the saved project; samples are decoded again.
    pub fn load_project(&mut self) -> Vec<AudioCommand> {
        let Some(state) = persistence::load_project(&self.project_dir) else {
            self.set_status("No saved project to load");
            return vec![];
        };
        let cmds = self.release_all();
        if let Some(midi) = self.midi.as_mut() {
            midi.flush_all();
        }
        self.transport = Transport::new(state.bpm);
        self.state = state;
        self.state.bpm = self.transport.bpm();
        self.chain_built = [false; NUM_TRACKS];
        self.session += 1;
        self.restore_samples();
        self.set_status("Project loaded");
        cmds
    }

    fn release_all(&mut self) -> Vec<AudioCommand> {
        let mut ids: Vec<SampleId> = self.state.tracks.iter_mut().filter_map(|t| t.sample_id.take()).collect();
        for row in 0..BANK_ROWS {
            for col in 0..BANK_COLS {
                if let Some(id) = self.state.bank.slot_mut(row, col).and_then(|s| s.sample_id.take()) {
                    ids.push(id);
                }
            }
        }
        ids.into_iter().map(|id| self.store.release(id)).collect()
    }

    /// Stops every clock and releases outstanding MIDI notes.
    pub fn shutdown(&mut self) {
        self.transport.stop();
        for track in 0..NUM_TRACKS {
            if self.transport.is_track_running(track) {
                self.transport.stop_track(track);
            }
        }
        if let Some(midi) = self.midi.as_mut() {
            midi.flush_all();
        }
    }

    // ── View ──────────────────────────────────────────────────────

    pub fn display_state(&self) -> DisplayState {
        let tracks = (0..NUM_TRACKS)
            .map(|track| {
                let settings = &self.state.tracks[track];
                TrackView {
                    name: settings.display_name().to_string(),
                    loaded: settings.is_loaded(),
                    volume: settings.volume,
                    step_count: self.state.grid.step_count(track),
                    steps: self.state.grid.row(track),
                    current_step: self.transport.current_step(track),
                    owner: self.transport.owner(track),
                    solo_running: self.transport.is_track_running(track),
                    effects: settings.effects.clone(),
                }
            })
            .collect();

        DisplayState {
            tracks,
            playing: self.transport.is_playing(),
            global_step: self.transport.global_step(),
            bpm: self.transport.bpm(),
            bank: self.state.bank.names(),
            midi: self.midi_status(),
            midi_outputs: self.midi.as_ref().map(|m| m.outputs().to_vec()).unwrap_or_default(),
            library: self.library.iter().map(|p| sample_loader::file_name(p)).collect(),
            status: self.status.clone(),
        }
    }
}
