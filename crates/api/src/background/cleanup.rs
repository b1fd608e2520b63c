//! Deferred removal of per-request artifacts.
//!
//! After a request finishes, its staged upload and output directory stay on
//! disk for a grace period (a response body may still be streaming from the
//! result file), then a detached task deletes both. Failures are logged and
//! never retried.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// What happened to one artifact during cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Already gone (or never created).
    Missing,
    Failed(String),
}

/// Result of one cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub staged_file: Removal,
    pub output_dir: Removal,
}

/// Spawns delayed cleanup tasks.
///
/// Cheap to clone; all clones share the same cancellation token and task
/// tracker.
#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    delay: Duration,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl CleanupScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Delete `staged_file` and `output_dir` once the delay has elapsed.
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    pub fn schedule(&self, output_dir: PathBuf, staged_file: PathBuf) {
        let delay = self.delay;
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(
                        output_dir = %output_dir.display(),
                        "Cleanup abandoned on shutdown"
                    );
                }
                () = tokio::time::sleep(delay) => {
                    run_cleanup(&output_dir, &staged_file).await;
                }
            }
        });

        tracing::info!(delay_secs = delay.as_secs(), "Scheduled cleanup task");
    }

    /// Abandon every pending cleanup. Artifacts of abandoned tasks stay on disk.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
    }

    /// Wait until every task scheduled so far has finished or been abandoned.
    ///
    /// Meant for tests and shutdown tooling, not for request paths: the
    /// shared tracker is closed while waiting and reopened afterwards (unless
    /// the scheduler was shut down), so tasks scheduled concurrently by other
    /// clones are waited on too.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if !self.cancel.is_cancelled() {
            self.tracker.reopen();
        }
    }

    /// Number of cleanup tasks still pending.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }
}

/// Delete the staged upload and the output directory, logging each outcome.
///
/// Each artifact is handled independently: a failure on the first does not
/// skip the second.
pub async fn run_cleanup(output_dir: &Path, staged_file: &Path) -> CleanupOutcome {
    tracing::info!("Cleanup task started");

    let staged = remove_artifact(staged_file, false).await;
    match &staged {
        Removal::Removed => {
            tracing::info!(path = %staged_file.display(), "Deleted temporary file");
        }
        Removal::Missing => {
            tracing::warn!(path = %staged_file.display(), "Temporary file not found");
        }
        Removal::Failed(e) => {
            tracing::error!(path = %staged_file.display(), error = %e, "Error deleting temporary file");
        }
    }

    let output = remove_artifact(output_dir, true).await;
    match &output {
        Removal::Removed => {
            tracing::info!(path = %output_dir.display(), "Deleted output directory");
        }
        Removal::Missing => {
            tracing::warn!(path = %output_dir.display(), "Output directory not found");
        }
        Removal::Failed(e) => {
            tracing::error!(path = %output_dir.display(), error = %e, "Error deleting output directory");
        }
    }

    CleanupOutcome {
        staged_file: staged,
        output_dir: output,
    }
}

async fn remove_artifact(path: &Path, recursive: bool) -> Removal {
    match tokio::fs::try_exists(path).await {
        Ok(false) => return Removal::Missing,
        Ok(true) => {}
        Err(e) => return Removal::Failed(e.to_string()),
    }

    let result = if recursive {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => Removal::Removed,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Removal::Missing,
        Err(e) => Removal::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts(root: &Path) -> (PathBuf, PathBuf) {
        let staged = root.join("uploads").join("song.mp3");
        let output = root.join("separated").join("0123456789abcdef");
        std::fs::create_dir_all(staged.parent().unwrap()).unwrap();
        std::fs::write(&staged, b"ID3").unwrap();
        std::fs::create_dir_all(output.join("hdemucs_mmi").join("song")).unwrap();
        std::fs::write(output.join("hdemucs_mmi/song/no_vocals.wav"), b"RIFF").unwrap();
        (staged, output)
    }

    #[tokio::test]
    async fn run_cleanup_removes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (staged, output) = artifacts(dir.path());

        let outcome = run_cleanup(&output, &staged).await;

        assert_eq!(outcome.staged_file, Removal::Removed);
        assert_eq!(outcome.output_dir, Removal::Removed);
        assert!(!staged.exists());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn run_cleanup_tolerates_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_cleanup(&dir.path().join("gone"), &dir.path().join("gone.mp3")).await;

        assert_eq!(outcome.staged_file, Removal::Missing);
        assert_eq!(outcome.output_dir, Removal::Missing);
    }

    #[tokio::test]
    async fn run_cleanup_continues_after_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (_, output) = artifacts(dir.path());
        // A directory where a file is expected makes remove_file fail.
        let bogus_staged = dir.path().join("uploads");

        let outcome = run_cleanup(&output, &bogus_staged).await;

        assert!(matches!(outcome.staged_file, Removal::Failed(_)));
        assert_eq!(outcome.output_dir, Removal::Removed);
        assert!(!output.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_cleanup_waits_for_delay() {
        let dir = tempfile::tempdir().unwrap();
        let (staged, output) = artifacts(dir.path());
        let scheduler = CleanupScheduler::new(Duration::from_secs(600));

        scheduler.schedule(output.clone(), staged.clone());
        assert_eq!(scheduler.pending(), 1);
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(staged.exists());
        assert!(output.exists());

        scheduler.wait_idle().await;
        assert!(!staged.exists());
        assert!(!output.exists());
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_pending_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let (staged, output) = artifacts(dir.path());
        let scheduler = CleanupScheduler::new(Duration::from_secs(600));

        scheduler.schedule(output.clone(), staged.clone());
        scheduler.shutdown();
        scheduler.wait_idle().await;

        assert!(staged.exists());
        assert!(output.exists());
    }
}
