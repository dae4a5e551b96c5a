use std::sync::Arc;

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;

/// Where a voice's output goes: through a track's effects chain, or straight
/// to the output (bank previews).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Track(usize),
    Direct,
}

/// One playing copy of a sample. Every trigger gets its own voice, so
/// retriggering a step never cuts off the previous hit.
#[derive(Clone, Debug)]
pub struct Voice {
    buffer: Arc<SampleBuffer>,
    pos: usize,
    pub gain: f32,
    pub route: Route,
    pub active: bool,
}

impl Voice {
    pub fn new(buffer: Arc<SampleBuffer>, gain: f32, route: Route) -> Self {
        let active = !buffer.is_empty();
        Self { buffer, pos: 0, gain, route, active }
    }

    // we're at a certain playback position, it's our job to mix this voice into `out`
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        if !self.active {
            return;
        }
        let remaining = &self.buffer.data[self.pos.min(self.buffer.len())..];
        let n = remaining.len().min(out.len());
        for (frame, sample) in out.iter_mut().zip(&remaining[..n]) {
            *frame += sample.scaled(self.gain);
        }
        self.pos += n;
        if self.pos >= self.buffer.len() {
            self.active = false;
        }
    }
}
