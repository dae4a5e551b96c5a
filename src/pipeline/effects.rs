// Per-track effect knob settings. Everything here is a linear knob value; the
// mapping onto engine units (Hz, Q, seconds) lives in `to_chain_params` and
// `EffectParam::to_chain_param`.

use serde::{Deserialize, Serialize};

use crate::audio::{ChainParam, ChainParams};

pub const CUTOFF_MAX_HZ: f32 = 20_000.0;
pub const RESONANCE_MAX_Q: f32 = 10.0;
pub const REVERB_MAX_DECAY_SECS: f32 = 10.0;
pub const DELAY_FEEDBACK_MAX: f32 = 0.9;

pub fn cutoff_hz(knob: f32) -> f32 {
    knob.clamp(0.0, 1.0) * CUTOFF_MAX_HZ
}

pub fn resonance_q(knob: f32) -> f32 {
    knob.clamp(0.0, 1.0) * RESONANCE_MAX_Q
}

pub fn reverb_decay_secs(knob: f32) -> f32 {
    knob.clamp(0.0, 1.0) * REVERB_MAX_DECAY_SECS
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub cutoff: f32,
    pub resonance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelaySettings {
    pub time: f32,
    pub feedback: f32,
    pub mix: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReverbSettings {
    pub size: f32,
    pub mix: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectSettings {
    pub filter: FilterSettings,
    pub delay: DelaySettings,
    pub reverb: ReverbSettings,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            filter: FilterSettings { cutoff: 1.0, resonance: 0.1 },
            delay: DelaySettings { time: 0.3, feedback: 0.3, mix: 0.2 },
            reverb: ReverbSettings { size: 0.5, mix: 0.2 },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectParam {
    FilterCutoff,
    FilterResonance,
    DelayTime,
    DelayFeedback,
    DelayMix,
    ReverbSize,
    ReverbMix,
}

impl EffectParam {
    pub const ALL: [EffectParam; 7] = [
        EffectParam::FilterCutoff,
        EffectParam::FilterResonance,
        EffectParam::DelayTime,
        EffectParam::DelayFeedback,
        EffectParam::DelayMix,
        EffectParam::ReverbSize,
        EffectParam::ReverbMix,
    ];

    pub fn max(self) -> f32 {
        match self {
            EffectParam::DelayFeedback => DELAY_FEEDBACK_MAX,
            _ => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EffectParam::FilterCutoff => "CUTOFF",
            EffectParam::FilterResonance => "RESO",
            EffectParam::DelayTime => "TIME",
            EffectParam::DelayFeedback => "FDBK",
            EffectParam::DelayMix => "DLY MIX",
            EffectParam::ReverbSize => "SIZE",
            EffectParam::ReverbMix => "VERB MIX",
        }
    }

    // None for reverb size: the reverb has to be regenerated instead of
    // being tweaked in place.
    pub fn to_chain_param(self, knob: f32) -> Option<ChainParam> {
        match self {
            EffectParam::FilterCutoff => Some(ChainParam::Cutoff(cutoff_hz(knob))),
            EffectParam::FilterResonance => Some(ChainParam::Resonance(resonance_q(knob))),
            EffectParam::DelayTime => Some(ChainParam::DelayTime(knob)),
            EffectParam::DelayFeedback => Some(ChainParam::DelayFeedback(knob)),
            EffectParam::DelayMix => Some(ChainParam::DelayMix(knob)),
            EffectParam::ReverbSize => None,
            EffectParam::ReverbMix => Some(ChainParam::ReverbMix(knob)),
        }
    }
}

impl EffectSettings {
    pub fn get(&self, param: EffectParam) -> f32 {
        match param {
            EffectParam::FilterCutoff => self.filter.cutoff,
            EffectParam::FilterResonance => self.filter.resonance,
            EffectParam::DelayTime => self.delay.time,
            EffectParam::DelayFeedback => self.delay.feedback,
            EffectParam::DelayMix => self.delay.mix,
            EffectParam::ReverbSize => self.reverb.size,
            EffectParam::ReverbMix => self.reverb.mix,
        }
    }

    // Clamps into the param's range and returns the stored value.
    pub fn set(&mut self, param: EffectParam, value: f32) -> f32 {
        let value = value.clamp(0.0, param.max());
        let slot = match param {
            EffectParam::FilterCutoff => &mut self.filter.cutoff,
            EffectParam::FilterResonance => &mut self.filter.resonance,
            EffectParam::DelayTime => &mut self.delay.time,
            EffectParam::DelayFeedback => &mut self.delay.feedback,
            EffectParam::DelayMix => &mut self.delay.mix,
            EffectParam::ReverbSize => &mut self.reverb.size,
            EffectParam::ReverbMix => &mut self.reverb.mix,
        };
        *slot = value;
        value
    }

    /// Clamps every knob into its range.
    pub fn normalize(&mut self) {
        for param in EffectParam::ALL {
            self.set(param, self.get(param));
        }
    }

    pub fn to_chain_params(&self) -> ChainParams {
        ChainParams {
            cutoff_hz: cutoff_hz(self.filter.cutoff),
            q: resonance_q(self.filter.resonance),
            delay_secs: self.delay.time,
            delay_feedback: self.delay.feedback,
            delay_mix: self.delay.mix,
            reverb_decay_secs: reverb_decay_secs(self.reverb.size),
            reverb_mix: self.reverb.mix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn knob_values_map_onto_engine_ranges() {
        assert_relative_eq!(cutoff_hz(1.0), 20_000.0);
        assert_relative_eq!(cutoff_hz(0.25), 5_000.0);
        assert_relative_eq!(resonance_q(0.1), 1.0);
        assert_relative_eq!(reverb_decay_secs(0.5), 5.0);
    }

    #[test]
    fn feedback_is_capped_below_one() {
        let mut fx = EffectSettings::default();
        assert_relative_eq!(fx.set(EffectParam::DelayFeedback, 1.0), 0.9);
        assert_relative_eq!(fx.set(EffectParam::DelayMix, 1.4), 1.0);
        assert_relative_eq!(fx.set(EffectParam::FilterCutoff, -0.2), 0.0);
    }

    #[test]
    fn only_reverb_size_needs_regeneration() {
        for param in EffectParam::ALL {
            let live = param.to_chain_param(0.5).is_some();
            assert_eq!(live, param != EffectParam::ReverbSize, "{:?}", param);
        }
    }

    #[test]
    fn defaults_match_the_initial_knob_positions() {
        let params = EffectSettings::default().to_chain_params();
        assert_relative_eq!(params.cutoff_hz, 20_000.0);
        assert_relative_eq!(params.q, 1.0);
        assert_relative_eq!(params.reverb_decay_secs, 5.0);
        assert_relative_eq!(params.delay_mix, 0.2);
    }
}
