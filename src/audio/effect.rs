use std::f32::consts::PI;

use super::frame::StereoFrame;

// Engine-unit parameters for one track chain. The knob -> unit mapping is done
// by the pipeline before anything reaches the audio thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainParams {
    pub cutoff_hz: f32,
    pub q: f32,
    pub delay_secs: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub reverb_decay_secs: f32,
    pub reverb_mix: f32,
}

// Live updates that don't need anything allocated. Reverb decay is missing on
// purpose: a new decay means a new `Reverb`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChainParam {
    Cutoff(f32),
    Resonance(f32),
    DelayTime(f32),
    DelayFeedback(f32),
    DelayMix(f32),
    ReverbMix(f32),
}

pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);
}

// ── Low-pass filter ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default)]
struct SvfState {
    ic1eq: f32,
    ic2eq: f32,
}

// Trapezoidal state-variable filter, low-pass output.
#[derive(Clone, Debug)]
pub struct LowPass {
    sample_rate: f32,
    cutoff_hz: f32,
    q: f32,
    g: f32,
    k: f32,
    left: SvfState,
    right: SvfState,
}

impl LowPass {
    pub fn new(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            cutoff_hz,
            q,
            g: 0.0,
            k: 0.0,
            left: SvfState::default(),
            right: SvfState::default(),
        };
        filter.update_coefficients();
        filter
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz;
        self.update_coefficients();
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q;
        self.update_coefficients();
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    fn update_coefficients(&mut self) {
        // stay clear of nyquist where tan() blows up
        let cutoff = self.cutoff_hz.clamp(10.0, self.sample_rate * 0.49);
        self.g = (PI * cutoff / self.sample_rate).tan();
        self.k = 1.0 / self.q.max(0.1);
    }

    #[inline]
    fn tick(g: f32, k: f32, s: &mut SvfState, x: f32) -> f32 {
        let v1 = (s.ic1eq + g * (x - s.ic2eq)) / (1.0 + g * (g + k));
        let v2 = s.ic2eq + g * v1;
        s.ic1eq = 2.0 * v1 - s.ic1eq;
        s.ic2eq = 2.0 * v2 - s.ic2eq;
        v2
    }
}

impl Effect for LowPass {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let (g, k) = (self.g, self.k);
        for f in buf.iter_mut() {
            f.left = Self::tick(g, k, &mut self.left, f.left);
            f.right = Self::tick(g, k, &mut self.right, f.right);
        }
    }
}

// ── Feedback delay ─────────────────────────────────────────────────

pub const MAX_DELAY_SECS: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct FeedbackDelay {
    line: Vec<StereoFrame>, // sized for MAX_DELAY_SECS up front
    write: usize,
    delay_frames: usize,
    sample_rate: f32,
    pub feedback: f32,
    pub mix: f32,
}

impl FeedbackDelay {
    pub fn new(delay_secs: f32, feedback: f32, mix: f32, sample_rate: f32) -> Self {
        let capacity = (MAX_DELAY_SECS * sample_rate) as usize + 1;
        let mut delay = Self {
            line: vec![StereoFrame::zero(); capacity],
            write: 0,
            delay_frames: 1,
            sample_rate,
            feedback: feedback.clamp(0.0, 0.9),
            mix: mix.clamp(0.0, 1.0),
        };
        delay.set_time(delay_secs);
        delay
    }

    pub fn set_time(&mut self, delay_secs: f32) {
        let frames = (delay_secs.clamp(0.0, MAX_DELAY_SECS) * self.sample_rate).round() as usize;
        self.delay_frames = frames.clamp(1, self.line.len() - 1);
    }

    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }
}

impl Effect for FeedbackDelay {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let len = self.line.len();
        for f in buf.iter_mut() {
            let read = (self.write + len - self.delay_frames) % len;
            let delayed = self.line[read];
            self.line[self.write] = StereoFrame {
                left: f.left + delayed.left * self.feedback,
                right: f.right + delayed.right * self.feedback,
            };
            self.write = (self.write + 1) % len;
            *f = f.mix(delayed, self.mix);
        }
    }
}

// ── Reverb ─────────────────────────────────────────────────────────
//
// Comb/allpass tank (Schroeder-Moorer layout). `generate` tunes every comb so
// the tail falls 60 dB over the requested decay and allocates fresh, silent
// delay lines, so it runs off the audio thread and the result gets swapped in.

const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const TUNING_RATE: f32 = 44_100.0;
const INPUT_GAIN: f32 = 0.015;
const DAMPING: f32 = 0.2;
const ALLPASS_FEEDBACK: f32 = 0.5;
pub const MIN_DECAY_SECS: f32 = 0.001;

#[derive(Clone, Debug)]
struct Comb {
    line: Vec<f32>,
    pos: usize,
    feedback: f32,
    store: f32,
}

impl Comb {
    fn new(len: usize, decay_secs: f32, sample_rate: f32) -> Self {
        // 60 dB down after decay_secs: g^(decay / delay) = 10^-3
        let feedback = 10f32.powf(-3.0 * len as f32 / (decay_secs * sample_rate));
        Self { line: vec![0.0; len.max(1)], pos: 0, feedback, store: 0.0 }
    }

    #[inline]
    fn tick(&mut self, x: f32) -> f32 {
        let out = self.line[self.pos];
        self.store = out * (1.0 - DAMPING) + self.store * DAMPING;
        self.line[self.pos] = x + self.store * self.feedback;
        self.pos = (self.pos + 1) % self.line.len();
        out
    }
}

#[derive(Clone, Debug)]
struct Allpass {
    line: Vec<f32>,
    pos: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self { line: vec![0.0; len.max(1)], pos: 0 }
    }

    #[inline]
    fn tick(&mut self, x: f32) -> f32 {
        let buffered = self.line[self.pos];
        self.line[self.pos] = x + buffered * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.line.len();
        buffered - x
    }
}

#[derive(Clone, Debug)]
pub struct Reverb {
    combs_l: Vec<Comb>,
    combs_r: Vec<Comb>,
    allpass_l: Vec<Allpass>,
    allpass_r: Vec<Allpass>,
    decay_secs: f32,
    pub mix: f32,
}

impl Reverb {
    pub fn generate(decay_secs: f32, mix: f32, sample_rate: f32) -> Self {
        let decay_secs = decay_secs.max(MIN_DECAY_SECS);
        let scale = sample_rate / TUNING_RATE;
        let scaled = |n: usize| ((n as f32) * scale).round() as usize;
        Self {
            combs_l: COMB_TUNING.iter().map(|&n| Comb::new(scaled(n), decay_secs, sample_rate)).collect(),
            combs_r: COMB_TUNING
                .iter()
                .map(|&n| Comb::new(scaled(n + STEREO_SPREAD), decay_secs, sample_rate))
                .collect(),
            allpass_l: ALLPASS_TUNING.iter().map(|&n| Allpass::new(scaled(n))).collect(),
            allpass_r: ALLPASS_TUNING.iter().map(|&n| Allpass::new(scaled(n + STEREO_SPREAD))).collect(),
            decay_secs,
            mix: mix.clamp(0.0, 1.0),
        }
    }

    pub fn decay_secs(&self) -> f32 {
        self.decay_secs
    }
}

impl Effect for Reverb {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let input = (f.left + f.right) * INPUT_GAIN;
            let mut wet_l: f32 = self.combs_l.iter_mut().map(|c| c.tick(input)).sum();
            let mut wet_r: f32 = self.combs_r.iter_mut().map(|c| c.tick(input)).sum();
            for ap in &mut self.allpass_l {
                wet_l = ap.tick(wet_l);
            }
            for ap in &mut self.allpass_r {
                wet_r = ap.tick(wet_r);
            }
            *f = f.mix(StereoFrame { left: wet_l, right: wet_r }, self.mix);
        }
    }
}

// ── Track chain ────────────────────────────────────────────────────

/// filter -> delay -> reverb, one per track.
#[derive(Clone, Debug)]
pub struct TrackChain {
    pub filter: LowPass,
    pub delay: FeedbackDelay,
    pub reverb: Reverb,
}

impl TrackChain {
    pub fn new(params: &ChainParams, sample_rate: f32) -> Self {
        Self {
            filter: LowPass::new(params.cutoff_hz, params.q, sample_rate),
            delay: FeedbackDelay::new(params.delay_secs, params.delay_feedback, params.delay_mix, sample_rate),
            reverb: Reverb::generate(params.reverb_decay_secs, params.reverb_mix, sample_rate),
        }
    }

    pub fn apply(&mut self, param: ChainParam) {
        match param {
            ChainParam::Cutoff(hz) => self.filter.set_cutoff(hz),
            ChainParam::Resonance(q) => self.filter.set_q(q),
            ChainParam::DelayTime(secs) => self.delay.set_time(secs),
            ChainParam::DelayFeedback(fb) => self.delay.feedback = fb.clamp(0.0, 0.9),
            ChainParam::DelayMix(mix) => self.delay.mix = mix.clamp(0.0, 1.0),
            ChainParam::ReverbMix(mix) => self.reverb.mix = mix.clamp(0.0, 1.0),
        }
    }

    /// Swaps in a regenerated reverb. The wet level set since the
    /// regeneration was requested wins over the one it was built with.
    pub fn replace_reverb(&mut self, mut reverb: Reverb) -> Reverb {
        reverb.mix = self.reverb.mix;
        std::mem::replace(&mut self.reverb, reverb)
    }
}

impl Effect for TrackChain {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        self.filter.process(buf);
        self.delay.process(buf);
        self.reverb.process(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SR: f32 = 44_100.0;

    fn impulse(len: usize) -> Vec<StereoFrame> {
        let mut buf = vec![StereoFrame::zero(); len];
        buf[0] = StereoFrame::mono(1.0);
        buf
    }

    #[test]
    fn low_pass_settles_on_dc() {
        let mut lp = LowPass::new(1_000.0, 0.707, SR);
        let mut buf = vec![StereoFrame::mono(1.0); 4_096];
        lp.process(&mut buf);
        assert_relative_eq!(buf[4_095].left, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn low_pass_attenuates_nyquist() {
        let mut lp = LowPass::new(500.0, 0.707, SR);
        let mut buf: Vec<StereoFrame> = (0..4_096)
            .map(|i| StereoFrame::mono(if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        lp.process(&mut buf);
        assert!(buf[4_000..].iter().all(|f| f.left.abs() < 0.01));
    }

    #[test]
    fn delay_echoes_after_the_delay_time() {
        let mut delay = FeedbackDelay::new(0.01, 0.0, 1.0, SR);
        assert_eq!(delay.delay_frames(), 441);
        let mut buf = impulse(1_000);
        delay.process(&mut buf);
        assert_relative_eq!(buf[0].left, 0.0);
        assert_relative_eq!(buf[441].left, 1.0);
        assert_relative_eq!(buf[882].left, 0.0); // no feedback, single echo
    }

    #[test]
    fn delay_feedback_repeats() {
        let mut delay = FeedbackDelay::new(0.01, 0.5, 1.0, SR);
        let mut buf = impulse(1_000);
        delay.process(&mut buf);
        assert_relative_eq!(buf[882].left, 0.5);
    }

    #[test]
    fn delay_time_is_clamped_to_the_line() {
        let mut delay = FeedbackDelay::new(0.0, 0.3, 0.2, SR);
        assert_eq!(delay.delay_frames(), 1);
        delay.set_time(5.0);
        assert_eq!(delay.delay_frames(), 44_100);
    }

    fn tail_energy(decay: f32) -> f32 {
        let mut reverb = Reverb::generate(decay, 1.0, SR);
        let mut buf = impulse(SR as usize);
        reverb.process(&mut buf);
        buf[22_050..].iter().map(|f| f.left * f.left).sum()
    }

    #[test]
    fn longer_decay_rings_longer() {
        assert!(tail_energy(8.0) > tail_energy(0.5) * 10.0);
        assert!(tail_energy(0.0) < 1e-9);
    }

    #[test]
    fn dry_reverb_passes_input_through() {
        let mut reverb = Reverb::generate(3.0, 0.0, SR);
        let mut buf = impulse(64);
        reverb.process(&mut buf);
        assert_relative_eq!(buf[0].left, 1.0);
    }

    #[test]
    fn replacing_the_reverb_keeps_the_current_mix() {
        let params = ChainParams {
            cutoff_hz: 20_000.0,
            q: 1.0,
            delay_secs: 0.3,
            delay_feedback: 0.3,
            delay_mix: 0.2,
            reverb_decay_secs: 5.0,
            reverb_mix: 0.2,
        };
        let mut chain = TrackChain::new(&params, SR);
        chain.apply(ChainParam::ReverbMix(0.7));
        let old = chain.replace_reverb(Reverb::generate(1.0, 0.2, SR));
        assert_relative_eq!(old.decay_secs(), 5.0);
        assert_relative_eq!(chain.reverb.decay_secs(), 1.0);
        assert_relative_eq!(chain.reverb.mix, 0.7);
    }

    #[test]
    fn live_params_reach_the_nodes() {
        let params = ChainParams {
            cutoff_hz: 20_000.0,
            q: 1.0,
            delay_secs: 0.3,
            delay_feedback: 0.3,
            delay_mix: 0.2,
            reverb_decay_secs: 5.0,
            reverb_mix: 0.2,
        };
        let mut chain = TrackChain::new(&params, SR);
        chain.apply(ChainParam::Cutoff(2_000.0));
        chain.apply(ChainParam::DelayFeedback(1.5));
        chain.apply(ChainParam::DelayTime(0.5));
        assert_relative_eq!(chain.filter.cutoff_hz(), 2_000.0);
        assert_relative_eq!(chain.delay.feedback, 0.9);
        assert_eq!(chain.delay.delay_frames(), 22_050);
    }
}
