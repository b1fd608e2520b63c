use std::path::PathBuf;
use std::time::Duration;

use vocalstrip_core::separation::demucs::{DEFAULT_LAUNCHER, DEFAULT_MODEL};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults that reproduce the stock deployment: port 9999,
/// uploads under `static/uploads`, results under `static/separated`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `9999`).
    pub port: u16,
    /// Directory uploads are staged in before separation.
    pub upload_dir: PathBuf,
    /// Root under which per-request output directories are created.
    pub separated_dir: PathBuf,
    /// Demucs model identifier.
    pub model: String,
    /// Program and leading arguments used to launch Demucs.
    pub demucs_command: Vec<String>,
    /// How long staged files and outputs are kept after a request.
    pub cleanup_delay: Duration,
    /// Upper bound on the multipart request body, in bytes.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                      |
    /// |----------------------|------------------------------|
    /// | `HOST`               | `0.0.0.0`                    |
    /// | `PORT`               | `9999`                       |
    /// | `UPLOAD_DIR`         | `static/uploads`             |
    /// | `SEPARATED_DIR`      | `static/separated`           |
    /// | `DEMUCS_MODEL`       | `hdemucs_mmi`                |
    /// | `DEMUCS_COMMAND`     | `python3 -m demucs.separate` |
    /// | `CLEANUP_DELAY_SECS` | `600`                        |
    /// | `MAX_UPLOAD_BYTES`   | `524288000` (500 MiB)        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "9999".into())
            .parse()
            .expect("PORT must be a valid u16");

        let upload_dir = std::env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| "static/uploads".into())
            .into();

        let separated_dir = std::env::var("SEPARATED_DIR")
            .unwrap_or_else(|_| "static/separated".into())
            .into();

        let model = std::env::var("DEMUCS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let demucs_command = std::env::var("DEMUCS_COMMAND")
            .map(|cmd| parse_command(&cmd))
            .unwrap_or_else(|_| DEFAULT_LAUNCHER.iter().map(|s| s.to_string()).collect());

        let cleanup_delay_secs: u64 = std::env::var("CLEANUP_DELAY_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("CLEANUP_DELAY_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (500 * 1024 * 1024).to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        Self {
            host,
            port,
            upload_dir,
            separated_dir,
            model,
            demucs_command,
            cleanup_delay: Duration::from_secs(cleanup_delay_secs),
            max_upload_bytes,
        }
    }
}

/// Split a command line on whitespace. Quoting is not supported.
fn parse_command(cmd: &str) -> Vec<String> {
    cmd.split_whitespace().map(str::to_string).collect()
}
