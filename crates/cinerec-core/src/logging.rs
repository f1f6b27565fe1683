//! Log output for a process whose terminal belongs to the UI
//!
//! Lines go to a file instead of stderr, plain text, filtered by an
//! `EnvFilter` directive such as `info` or `cinerec_core=debug`.

use anyhow::{anyhow, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub fn default_log_path() -> Result<PathBuf> {
    Ok(Config::config_dir()?.join("cinerec.log"))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(log_path: &Path, filter: &str) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(log_path)?;
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("cinerec.log");

        init(&path, "debug").unwrap();
        tracing::info!("log file smoke test");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("log file smoke test"));

        // second subscriber is refused
        assert!(init(&path, "debug").is_err());
    }
}
