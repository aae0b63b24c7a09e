//! Error types for CLI operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Neither the config nor `--dir` names a recording directory
    #[error("No recording directory: set [replay].directory or pass --dir")]
    NoReplayDirectory,

    /// Recording directory holds no file for any channel
    #[error("No channel recordings found in {}", directory.display())]
    NoRecordings { directory: PathBuf },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn no_recordings(directory: &Path) -> Self {
        Self::NoRecordings {
            directory: directory.to_path_buf(),
        }
    }
}
