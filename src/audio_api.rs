use std::sync::Arc;

pub use crate::audio::{ChainParam, Reverb, Route, SampleBuffer, SampleId, TrackChain};

#[derive(Clone, Debug)]
pub struct TriggerParams {
    pub route: Route,
    pub sample_id: SampleId,
    pub gain: f32,
}

#[derive(Debug)]
pub enum AudioCommand {
    // The engine can't load files (interrupts thread), so the worker decodes
    // first, then the buffer gets registered here under its id
    RegisterSample { id: SampleId, buffer: Arc<SampleBuffer> },
    ReleaseSample { id: SampleId },

    // Chains and reverbs are allocated off the audio thread and moved in whole
    InstallChain { track: usize, chain: Box<TrackChain> },
    ReplaceReverb { track: usize, reverb: Box<Reverb> },
    SetParam { track: usize, param: ChainParam },

    // The engine then uses the sample id to trigger the sound
    Trigger(TriggerParams),
}
