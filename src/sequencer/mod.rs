mod transport;

pub use transport::{step_duration, StepTrigger, Transport};

/// Which clock drives a track. A track lives in exactly one clock domain at a
/// time; `Muted` tracks are skipped by every clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClockOwner {
    #[default]
    Global,
    Solo,
    Muted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}
