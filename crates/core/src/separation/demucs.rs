//! Demucs command builder and runner.
//!
//! The tool is launched as a child process with inherited stdout/stderr so
//! its `--verbose` progress lands in the server's own log stream. The child
//! is awaited asynchronously and is not killed if the awaiting request goes
//! away.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use super::{SeparationError, SeparationJob, Separator};

/// Default launcher: the Demucs module run by the system Python.
pub const DEFAULT_LAUNCHER: &[&str] = &["python3", "-m", "demucs.separate"];

/// Default pretrained model.
pub const DEFAULT_MODEL: &str = "hdemucs_mmi";

/// Fixed quality/performance knobs passed on every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemucsParams {
    /// Number of random shifts averaged per prediction.
    pub shifts: u32,
    /// Segment length in seconds fed to the model at once.
    pub segment_secs: u32,
    /// Stem isolated against "everything else" in two-stem mode.
    pub two_stems: String,
    pub verbose: bool,
}

impl Default for DemucsParams {
    fn default() -> Self {
        Self {
            shifts: 1,
            segment_secs: 45,
            two_stems: "vocals".to_string(),
            verbose: true,
        }
    }
}

/// Runs Demucs through a configurable launcher command.
#[derive(Debug, Clone)]
pub struct DemucsSeparator {
    /// Program followed by its leading arguments, e.g.
    /// `["python3", "-m", "demucs.separate"]`.
    launcher: Vec<String>,
    params: DemucsParams,
}

impl DemucsSeparator {
    /// Build a separator from a launcher command line.
    ///
    /// An empty launcher falls back to [`DEFAULT_LAUNCHER`].
    pub fn new(launcher: Vec<String>, params: DemucsParams) -> Self {
        let launcher = if launcher.is_empty() {
            DEFAULT_LAUNCHER.iter().map(|s| s.to_string()).collect()
        } else {
            launcher
        };
        Self { launcher, params }
    }

    /// Full argument vector after the program name, for `job`.
    pub fn args(&self, job: &SeparationJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.launcher[1..].iter().map(OsString::from).collect();
        args.push(job.input_path.clone().into_os_string());
        args.push(format!("--name={}", job.model).into());
        args.push(format!("--shifts={}", self.params.shifts).into());
        args.push(format!("--segment={}", self.params.segment_secs).into());
        args.push(format!("--two-stems={}", self.params.two_stems).into());

        let mut out = OsString::from("--out=");
        out.push(job.output_dir.as_os_str());
        args.push(out);

        if self.params.verbose {
            args.push("--verbose".into());
        }
        args
    }

    fn program(&self) -> &str {
        &self.launcher[0]
    }

    /// Human-readable command line, used in logs and failure details.
    pub fn command_line(&self, job: &SeparationJob) -> String {
        std::iter::once(self.program().to_string())
            .chain(self.args(job).iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for DemucsSeparator {
    fn default() -> Self {
        Self::new(Vec::new(), DemucsParams::default())
    }
}

#[async_trait]
impl Separator for DemucsSeparator {
    async fn separate(&self, job: &SeparationJob) -> Result<(), SeparationError> {
        let command = self.command_line(job);
        tracing::info!(%command, model = %job.model, "Running separation");

        let start = Instant::now();
        let status = Command::new(self.program())
            .args(self.args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false)
            .status()
            .await
            .map_err(|source| SeparationError::Spawn {
                program: self.program().to_string(),
                source,
            })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            tracing::error!(%command, exit_code = ?status.code(), duration_ms, "Separation failed");
            return Err(SeparationError::ExecutionFailed {
                command,
                exit_code: status.code(),
            });
        }

        tracing::info!(duration_ms, "Separation finished");
        Ok(())
    }
}
