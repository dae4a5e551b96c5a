use std::collections::HashMap;
use std::sync::Arc;

use crate::audio_api::{AudioCommand, TriggerParams};
use crate::shared::NUM_TRACKS;

use super::effect::{Effect, TrackChain};
use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sample_id::SampleId;
use super::voice::{Route, Voice};

const VOICE_CAPACITY: usize = 64; // grows past this if it has to, no voice stealing
const BUS_FRAMES: usize = 4096;

pub struct Engine {
    samples: HashMap<SampleId, Arc<SampleBuffer>>,
    chains: [Option<Box<TrackChain>>; NUM_TRACKS],
    voices: Vec<Voice>,
    bus: Vec<StereoFrame>, // per-track scratch, reused every block
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            samples: HashMap::new(),
            chains: std::array::from_fn(|_| None),
            voices: Vec::with_capacity(VOICE_CAPACITY),
            bus: vec![StereoFrame::zero(); BUS_FRAMES],
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::ReleaseSample { id } => {
                self.samples.remove(&id);
            }
            AudioCommand::InstallChain { track, chain } => {
                if let Some(slot) = self.chains.get_mut(track) {
                    *slot = Some(chain); // old chain (and its tail) goes away here
                }
            }
            AudioCommand::ReplaceReverb { track, reverb } => {
                if let Some(Some(chain)) = self.chains.get_mut(track) {
                    chain.replace_reverb(*reverb);
                }
            }
            AudioCommand::SetParam { track, param } => {
                if let Some(Some(chain)) = self.chains.get_mut(track) {
                    chain.apply(param);
                }
            }
            AudioCommand::Trigger(t) => self.trigger_voice(t),
        }
    }

    fn trigger_voice(&mut self, t: TriggerParams) {
        // released or never registered: silent no-op
        if let Some(buffer) = self.samples.get(&t.sample_id) {
            self.voices.push(Voice::new(Arc::clone(buffer), t.gain, t.route));
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn has_chain(&self, track: usize) -> bool {
        self.chains.get(track).is_some_and(|c| c.is_some())
    }

    pub fn has_sample(&self, id: SampleId) -> bool {
        self.samples.contains_key(&id)
    }

    /// Renders one block: every track's voices through its chain, then the
    /// direct voices on top.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        if self.bus.len() < out.len() {
            self.bus.resize(out.len(), StereoFrame::zero());
        }

        let Engine { chains, voices, bus, .. } = self;
        let bus = &mut bus[..out.len()];

        for (track, chain) in chains.iter_mut().enumerate() {
            bus.fill(StereoFrame::zero());
            let mut sounding = false;
            for voice in voices.iter_mut().filter(|v| v.route == Route::Track(track)) {
                voice.render_into(bus);
                sounding = true;
            }
            match chain {
                // keep running the chain with no voices so delay/reverb tails ring out
                Some(chain) => chain.process(bus),
                None if !sounding => continue,
                None => {}
            }
            for (o, b) in out.iter_mut().zip(bus.iter()) {
                *o += *b;
            }
        }

        for voice in voices.iter_mut().filter(|v| v.route == Route::Direct) {
            voice.render_into(out);
        }

        voices.retain(|v| v.active);
    }
}
