// Called on startup and quit (and on demand from the UI); saves the project so
// we can reload it later, and writes the bank export next to the samples.
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::pipeline::bank::{SampleBank, BANK_EXPORT_FILE};
use crate::pipeline::project::ProjectState;

const PROJECT_DIR: &str = ".circuit-tracks";
const PROJECT_FILE: &str = "project.json";

// <project_dir>/.circuit-tracks/project.json
pub fn project_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_DIR).join(PROJECT_FILE)
}

pub fn load_project(project_dir: &Path) -> Option<ProjectState> {
    let path = project_file_path(project_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<ProjectState>(&data) {
        Ok(mut state) => {
            state.normalize();
            info!("Loaded project from {}", path.display());
            Some(state)
        }
        Err(e) => {
            warn!("Ignoring unreadable project file {}: {}", path.display(), e);
            None
        }
    }
}

// Save the project state to disk, making the files if they don't exist already
pub fn save_project(project_dir: &Path, state: &ProjectState) -> anyhow::Result<PathBuf> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .circuit-tracks/ if needed
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json)?;
    info!("Saved project to {}", path.display());
    Ok(path)
}

// <dir>/sample-bank.json, names only
pub fn export_bank(dir: &Path, bank: &SampleBank) -> anyhow::Result<PathBuf> {
    let path = dir.join(BANK_EXPORT_FILE);
    std::fs::write(&path, bank.export_json()?)?;
    info!("Exported sample bank to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::bank::BankExport;

    #[test]
    fn project_round_trips_through_the_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = ProjectState::default();
        state.bpm = 96;
        state.grid.set_step_count(2, 12);
        state.grid.toggle_step(2, 11);
        state.tracks[2].sample_path = "/samples/hat.wav".into();

        let written = save_project(dir.path(), &state).unwrap();
        assert!(written.ends_with(".circuit-tracks/project.json"));

        let loaded = load_project(dir.path()).unwrap();
        assert_eq!(loaded.bpm, 96);
        assert_eq!(loaded.grid, state.grid);
        assert_eq!(loaded.tracks[2].sample_path, "/samples/hat.wav");
    }

    #[test]
    fn missing_or_corrupt_projects_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_project(dir.path()).is_none());

        std::fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(project_file_path(dir.path()), "{ not json").unwrap();
        assert!(load_project(dir.path()).is_none());
    }

    #[test]
    fn hand_edited_step_counts_are_reset_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_project(dir.path(), &ProjectState::default()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["grid"]["step_counts"][0] = serde_json::json!(0);
        value["grid"]["step_counts"][1] = serde_json::json!(7);
        value["tracks"][0]["volume"] = serde_json::json!(5.0);
        std::fs::write(&path, value.to_string()).unwrap();

        let loaded = load_project(dir.path()).unwrap();
        assert_eq!(loaded.grid.step_count(0), 16);
        assert_eq!(loaded.grid.step_count(1), 16);
        assert_eq!(loaded.tracks[0].volume, 1.0);
    }

    #[test]
    fn bank_export_is_written_as_sample_bank_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut bank = SampleBank::default();
        bank.install(0, 0, "kick.wav", "kick.wav", crate::audio::next_sample_id());

        let path = export_bank(dir.path(), &bank).unwrap();
        assert_eq!(path.file_name().unwrap(), "sample-bank.json");

        let parsed: BankExport = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, bank.export());
        assert_eq!(parsed.samples[0][0], "kick.wav");
        assert_eq!(parsed.samples[0][1], "Empty");
    }
}
