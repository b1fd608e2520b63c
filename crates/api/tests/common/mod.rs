#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use vocalstrip_api::background::cleanup::CleanupScheduler;
use vocalstrip_api::config::ServerConfig;
use vocalstrip_api::router::build_app_router;
use vocalstrip_api::state::AppState;
use vocalstrip_core::separation::{SeparationError, SeparationJob, Separator};

pub const BOUNDARY: &str = "vocalstrip-test-boundary";

/// Bytes the fake tool writes as its `no_vocals.wav`.
pub const FAKE_STEM: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt fake instrumental";

/// How the fake separation tool behaves.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Exit 0 and write `FAKE_STEM` where the real tool would.
    Succeed,
    /// Exit non-zero after leaving a partial output tree behind.
    Fail { exit_code: i32 },
    /// Exit 0 without writing anything.
    Silent,
}

/// Stand-in for Demucs that records every job it is given.
pub struct FakeSeparator {
    behaviour: Behaviour,
    jobs: Mutex<Vec<SeparationJob>>,
}

impl FakeSeparator {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Vec<SeparationJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Separator for FakeSeparator {
    async fn separate(&self, job: &SeparationJob) -> Result<(), SeparationError> {
        self.jobs.lock().unwrap().push(job.clone());

        // The real tool reads its input; make sure it was staged.
        assert!(job.input_path.is_file(), "input not staged: {:?}", job.input_path);
        assert!(job.output_dir.is_dir(), "output dir missing: {:?}", job.output_dir);

        match self.behaviour {
            Behaviour::Succeed => {
                let result = job.result_path();
                tokio::fs::create_dir_all(result.parent().unwrap()).await.unwrap();
                tokio::fs::write(&result, FAKE_STEM).await.unwrap();
                Ok(())
            }
            Behaviour::Fail { exit_code } => {
                tokio::fs::create_dir_all(job.output_dir.join(&job.model))
                    .await
                    .unwrap();
                Err(SeparationError::ExecutionFailed {
                    command: format!("demucs {}", job.input_path.display()),
                    exit_code: Some(exit_code),
                })
            }
            Behaviour::Silent => Ok(()),
        }
    }
}

/// A router wired to a fake separator and private temp directories.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub separator: Arc<FakeSeparator>,
    pub upload_dir: PathBuf,
    pub separated_dir: PathBuf,
    _root: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn staged_files(&self) -> Vec<PathBuf> {
        list_dir(&self.upload_dir)
    }

    pub fn output_dirs(&self) -> Vec<PathBuf> {
        list_dir(&self.separated_dir)
    }
}

fn list_dir(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    entries
}

/// Build a test `ServerConfig` rooted in `root`.
pub fn test_config(root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_dir: root.join("uploads"),
        separated_dir: root.join("separated"),
        model: "hdemucs_mmi".to_string(),
        demucs_command: vec!["python3".into(), "-m".into(), "demucs.separate".into()],
        cleanup_delay: Duration::from_secs(600),
        max_upload_bytes: 1024 * 1024,
    }
}

/// Build the full application router (same middleware stack as production)
/// around a fake separation tool.
pub fn build_test_app(behaviour: Behaviour) -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    std::fs::create_dir_all(&config.upload_dir).unwrap();
    std::fs::create_dir_all(&config.separated_dir).unwrap();

    let separator = Arc::new(FakeSeparator::new(behaviour));
    let state = AppState {
        config: Arc::new(config.clone()),
        separator: separator.clone(),
        cleanup: CleanupScheduler::new(config.cleanup_delay),
    };

    TestApp {
        router: build_app_router(state.clone()),
        state,
        separator,
        upload_dir: config.upload_dir,
        separated_dir: config.separated_dir,
        _root: root,
    }
}

/// One part of a multipart body.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            data: value.as_bytes(),
        }
    }
}

/// Encode `parts` as a `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n",
                        part.name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart body to `/separate`.
pub async fn post_separate(app: Router, parts: &[Part<'_>]) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/separate")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST an upload with a single `audio` file part.
pub async fn upload(app: Router, filename: &str, data: &[u8]) -> Response {
    post_separate(app, &[Part::file("audio", filename, data)]).await
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
