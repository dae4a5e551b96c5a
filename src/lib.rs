pub mod audio;
pub mod audio_api;
pub mod config;
pub mod loader;
pub mod logging;
pub mod middle;
pub mod midi;
pub mod pipeline;
pub mod sequencer;
pub mod shared;
pub mod tui;
