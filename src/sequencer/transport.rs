use crate::pipeline::grid::StepGrid;
use crate::shared::{DEFAULT_BPM, MAX_BPM, MIN_BPM, NUM_TRACKS, STEPS_PER_TRACK};

use super::{ClockOwner, Direction};

/// One 1/16 note at `bpm`, in seconds.
pub fn step_duration(bpm: u32) -> f64 {
    60.0 / (bpm as f64 * 4.0)
}

/// A playable step that came due. `at` is transport time in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepTrigger {
    pub track: usize,
    pub step: usize,
    pub at: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Clock {
    running: bool,
    step: Option<usize>, // last step fired
    until_next: f64,
}

impl Clock {
    fn start(&mut self) {
        self.running = true;
        self.step = None;
        self.until_next = 0.0; // first step fires on the next advance
    }

    fn stop(&mut self) {
        *self = Clock::default();
    }

    // ticks that fall inside the next `elapsed` seconds, as (offset, step)
    fn run(&mut self, elapsed: f64, dur: f64, wrap: usize) -> Vec<(f64, usize)> {
        if !self.running {
            return vec![];
        }
        let mut fired = vec![];
        let mut t = self.until_next;
        while t <= elapsed {
            let next = self.step.map_or(0, |s| (s + 1) % wrap);
            self.step = Some(next);
            fired.push((t, next));
            t += dur;
        }
        self.until_next = t - elapsed;
        fired
    }
}

/// The global clock plus one solo clock per track, reconciled by a single
/// `advance` call from the main loop. The owner tag decides which clock (if
/// any) a track listens to.
#[derive(Clone, Debug)]
pub struct Transport {
    bpm: u32,
    now: f64,
    global: Clock,
    solos: [Clock; NUM_TRACKS],
    owners: [ClockOwner; NUM_TRACKS],
    cursors: [Option<usize>; NUM_TRACKS],
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl Transport {
    pub fn new(bpm: u32) -> Self {
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            now: 0.0,
            global: Clock::default(),
            solos: [Clock::default(); NUM_TRACKS],
            owners: [ClockOwner::Global; NUM_TRACKS],
            cursors: [None; NUM_TRACKS],
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Clamped to 60..=200. Takes effect from the next tick of every clock.
    pub fn set_bpm(&mut self, bpm: u32) -> u32 {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.bpm
    }

    pub fn step_duration(&self) -> f64 {
        step_duration(self.bpm)
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_playing(&self) -> bool {
        self.global.running
    }

    pub fn start(&mut self) {
        if !self.global.running {
            self.global.start();
        }
    }

    pub fn stop(&mut self) {
        self.global.stop();
        for track in 0..NUM_TRACKS {
            if self.owners[track] == ClockOwner::Global {
                self.cursors[track] = None;
            }
        }
    }

    pub fn owner(&self, track: usize) -> ClockOwner {
        self.owners.get(track).copied().unwrap_or_default()
    }

    /// Moves the track onto its own clock, starting from step 0.
    pub fn start_track(&mut self, track: usize) {
        if track >= NUM_TRACKS {
            return;
        }
        self.owners[track] = ClockOwner::Solo;
        self.solos[track].start();
        self.cursors[track] = None;
    }

    /// Hands the track back to the global clock.
    pub fn stop_track(&mut self, track: usize) {
        if track >= NUM_TRACKS {
            return;
        }
        self.solos[track].stop();
        self.owners[track] = ClockOwner::Global;
        self.cursors[track] = None;
    }

    pub fn is_track_running(&self, track: usize) -> bool {
        self.solos.get(track).is_some_and(|c| c.running)
    }

    /// Muting also stops a running solo clock. Unmuting returns to global.
    pub fn set_muted(&mut self, track: usize, muted: bool) {
        if track >= NUM_TRACKS {
            return;
        }
        self.solos[track].stop();
        self.cursors[track] = None;
        self.owners[track] = if muted { ClockOwner::Muted } else { ClockOwner::Global };
    }

    pub fn global_step(&self) -> Option<usize> {
        self.global.step
    }

    pub fn current_step(&self, track: usize) -> Option<usize> {
        self.cursors.get(track).copied().flatten()
    }

    /// Moves the track's cursor one step, wrapping inside its step count, and
    /// returns a trigger when the new position is playable. A running solo
    /// clock picks up from the new position.
    pub fn advance_step(&mut self, track: usize, direction: Direction, grid: &StepGrid) -> Option<StepTrigger> {
        if track >= NUM_TRACKS {
            return None;
        }
        let count = grid.step_count(track);
        if count == 0 {
            return None;
        }
        let step = match (self.cursors[track], direction) {
            (None, Direction::Forward) => 0,
            (None, Direction::Backward) => count - 1,
            (Some(s), Direction::Forward) => (s + 1) % count,
            (Some(s), Direction::Backward) => {
                if s == 0 || s >= count { count - 1 } else { s - 1 }
            }
        };
        self.cursors[track] = Some(step);
        if self.solos[track].running {
            self.solos[track].step = Some(step);
        }
        grid.is_playable(track, step).then_some(StepTrigger { track, step, at: self.now })
    }

    /// Runs every clock forward by `elapsed` seconds and returns the playable
    /// steps that came due, in time order.
    pub fn advance(&mut self, elapsed: f64, grid: &StepGrid) -> Vec<StepTrigger> {
        let dur = self.step_duration();
        let start = self.now;
        let mut due = vec![];

        for (offset, step) in self.global.run(elapsed, dur, STEPS_PER_TRACK) {
            for track in 0..NUM_TRACKS {
                if self.owners[track] != ClockOwner::Global {
                    continue;
                }
                self.cursors[track] = Some(step);
                if grid.is_playable(track, step) {
                    due.push(StepTrigger { track, step, at: start + offset });
                }
            }
        }

        for track in 0..NUM_TRACKS {
            if self.owners[track] != ClockOwner::Solo {
                continue;
            }
            for (offset, step) in self.solos[track].run(elapsed, dur, STEPS_PER_TRACK) {
                self.cursors[track] = Some(step);
                if grid.is_playable(track, step) {
                    due.push(StepTrigger { track, step, at: start + offset });
                }
            }
        }

        self.now += elapsed;
        due.sort_by(|a, b| a.at.total_cmp(&b.at));
        due
    }
}
