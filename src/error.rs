//! Error taxonomy for a recording session.
//!
//! Every variant except `Subprocess`/`Timeout` raised by the fast concatenation
//! path is fatal for the session. Cleanup problems are never errors; they are
//! logged as warnings where they happen.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The environment is not set up for a session (e.g. missing output directory).
    #[error("{0}")]
    Precondition(String),

    #[error("No {0} found. Connect a capture device and try again.")]
    DeviceNotFound(String),

    #[error("Could not generate padding clips: {0}")]
    AssetGeneration(String),

    #[error("{program} failed: {reason}")]
    Subprocess { program: String, reason: String },

    #[error("{program} did not finish within {}s", .limit.as_secs())]
    Timeout { program: String, limit: Duration },

    #[error("Expected file was not created: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("Prompt cancelled: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RecordError {
    pub fn subprocess(program: impl Into<String>, reason: impl Into<String>) -> Self {
        RecordError::Subprocess {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = RecordError> = std::result::Result<T, E>;
