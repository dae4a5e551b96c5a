use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::shared::{DEFAULT_BPM, MAX_BPM, MIN_BPM};

#[derive(Parser, Debug, Clone)]
#[command(name = "circuit-tracks", version, about = "Sample step sequencer with MIDI out to a Circuit Tracks")]
pub struct Args {
    /// Project directory; samples are listed from here and the project is saved under it
    #[arg(value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Starting tempo, overrides the saved project
    #[arg(long, value_parser = clap::value_parser!(u32).range(MIN_BPM as i64..=MAX_BPM as i64))]
    pub bpm: Option<u32>,

    /// MIDI output to connect to, by port name
    #[arg(long, value_name = "NAME", conflicts_with = "no_midi")]
    pub midi_output: Option<String>,

    /// Run audio-only
    #[arg(long)]
    pub no_midi: bool,

    /// Print the MIDI outputs and exit
    #[arg(long)]
    pub list_midi: bool,

    /// Log file (default: ~/.local/share/circuit-tracks/logs/app.log)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL", default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse::<LevelFilter>().map_err(|_| format!("unknown log level '{s}'"))
}

impl Args {
    pub fn project_dir(&self) -> PathBuf {
        self.project_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn bpm_or(&self, saved: u32) -> u32 {
        self.bpm.unwrap_or(if saved == 0 { DEFAULT_BPM } else { saved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_audio_and_midi() {
        let args = Args::try_parse_from(["circuit-tracks"]).unwrap();
        assert!(!args.no_midi);
        assert_eq!(args.log_level, LevelFilter::Info);
        assert_eq!(args.bpm_or(95), 95);
    }

    #[test]
    fn tempo_outside_the_range_is_rejected() {
        assert!(Args::try_parse_from(["circuit-tracks", "--bpm", "250"]).is_err());
        let args = Args::try_parse_from(["circuit-tracks", "--bpm", "140", "songs"]).unwrap();
        assert_eq!(args.bpm_or(95), 140);
        assert_eq!(args.project_dir(), PathBuf::from("songs"));
    }

    #[test]
    fn midi_output_and_no_midi_conflict() {
        assert!(Args::try_parse_from(["circuit-tracks", "--no-midi", "--midi-output", "X"]).is_err());
    }

    #[test]
    fn log_level_parses_any_case() {
        let args = Args::try_parse_from(["circuit-tracks", "--log-level", "DEBUG"]).unwrap();
        assert_eq!(args.log_level, LevelFilter::Debug);
        assert!(Args::try_parse_from(["circuit-tracks", "--log-level", "loud"]).is_err());
    }
}
