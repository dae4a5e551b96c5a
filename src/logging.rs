use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

// The terminal belongs to the UI, so logs go to a file.
pub fn default_log_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("circuit-tracks")
        .join("logs")
        .join("app.log"))
}

pub fn init_logger(path: &Path, level: LevelFilter) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    let config = ConfigBuilder::new().set_thread_level(LevelFilter::Debug).build();
    WriteLogger::init(level, config, log_file).context("logger already initialised")?;
    Ok(())
}
