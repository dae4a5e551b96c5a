//! MIDI forwarding for the first four tracks.
//!
//! - [`MidiEngine`] is the seam between the bridge and a device backend
//! - [`MidirEngine`] talks to real ports through `midir`
//! - [`MockMidiEngine`] records what would have been sent, for tests
//! - [`MidiBridge`] maps track triggers to note-on/note-off pairs
mod bridge;
mod engine;
pub mod midir_engine;
pub mod mock_engine;

pub use bridge::{note_for_track, velocity_for_volume, MidiBridge, MidiNote, MIDI_TRACKS};
pub use engine::{MidiEngine, MidiError, MidiMessage, Result, TransportSignal};
pub use midir_engine::{listen_for_transport, MidirEngine};
pub use mock_engine::MockMidiEngine;
