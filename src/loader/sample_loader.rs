use std::path::{Path, PathBuf};

use crate::audio::{next_sample_id, SampleBuffer, SampleId};

pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

// Decode a sample from disk, prepare for registration with the engine
pub fn load(path: &Path, target_rate: u32) -> anyhow::Result<(SampleId, SampleBuffer)> {
    let buffer = SampleBuffer::load_file(path, target_rate)?;
    Ok((next_sample_id(), buffer))
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// Every .wav/.mp3 directly inside `dir`, sorted by name
pub fn index_samples_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_matched_case_insensitively() {
        assert!(is_supported(Path::new("kick.wav")));
        assert!(is_supported(Path::new("Snare.MP3")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("wav")));
    }

    #[test]
    fn index_lists_only_samples_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.wav", "a.mp3", "readme.md", "c.WAV"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("d.wav")).unwrap();

        let names: Vec<String> = index_samples_in_dir(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.wav", "c.WAV"]);
    }
}
