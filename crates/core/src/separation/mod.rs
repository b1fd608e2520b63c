//! Vocal separation jobs and the executor interface.
//!
//! A [`SeparationJob`] pins down where the staged input lives, which
//! directory the tool may write into, and which model to ask for. The
//! [`Separator`] trait hides how the tool is actually run so the HTTP layer
//! can be tested without a model installed.

pub mod demucs;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::upload::{file_stem, NO_VOCALS_FILENAME};

pub use demucs::{DemucsParams, DemucsSeparator};

/// Errors from running the separation tool or collecting its output.
#[derive(Debug, thiserror::Error)]
pub enum SeparationError {
    #[error("failed to launch separation tool `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` returned non-zero exit status {}", display_exit_code(.exit_code))]
    ExecutionFailed {
        command: String,
        /// `None` when the process was killed by a signal.
        exit_code: Option<i32>,
    },

    #[error("expected output file missing: {}", .0.display())]
    OutputMissing(PathBuf),
}

fn display_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown (terminated by signal)".to_string(), |c| c.to_string())
}

/// One invocation of the separation tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparationJob {
    /// Staged upload handed to the tool.
    pub input_path: PathBuf,
    /// Per-request directory the tool writes into.
    pub output_dir: PathBuf,
    /// Model identifier, also the first path segment of the tool's output.
    pub model: String,
}

impl SeparationJob {
    pub fn new(input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, model: &str) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            model: model.to_string(),
        }
    }

    /// Input filename without its extension; the tool names its track
    /// directory after it.
    pub fn track_name(&self) -> String {
        let name = self
            .input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        file_stem(&name).to_string()
    }

    /// `<output_dir>/<model>/<track_name>/no_vocals.wav`
    pub fn result_path(&self) -> PathBuf {
        self.output_dir
            .join(&self.model)
            .join(self.track_name())
            .join(NO_VOCALS_FILENAME)
    }

    /// Return the result path if the tool actually produced a regular file
    /// there.
    pub async fn locate_result(&self) -> Result<PathBuf, SeparationError> {
        let path = self.result_path();
        if is_regular_file(&path).await {
            Ok(path)
        } else {
            Err(SeparationError::OutputMissing(path))
        }
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Runs the external separation tool for a job.
///
/// Implementations must only return `Ok` once the tool has exited
/// successfully; they do not check for the result file.
#[async_trait]
pub trait Separator: Send + Sync {
    async fn separate(&self, job: &SeparationJob) -> Result<(), SeparationError>;
}
