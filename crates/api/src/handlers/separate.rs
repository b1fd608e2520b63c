//! Handler for `POST /separate`.
//!
//! Stages the uploaded track, runs the separation tool into a fresh
//! per-request directory, and streams back the `no_vocals` stem. Every
//! request that gets as far as staging schedules deferred cleanup of its
//! artifacts, whether it succeeds or not.

use std::path::Path;

use axum::body::{Body, Bytes};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use vocalstrip_core::error::UploadError;
use vocalstrip_core::separation::SeparationJob;
use vocalstrip_core::token::OutputToken;
use vocalstrip_core::upload::AudioUpload;

use crate::error::AppResult;
use crate::state::AppState;

/// Multipart field carrying the audio file.
pub const AUDIO_FIELD: &str = "audio";

/// MIME type of the returned stem.
pub const RESULT_CONTENT_TYPE: &str = "audio/wav";

/// POST /separate
///
/// Accepts a multipart body with an `audio` file field and responds with the
/// instrumental track as a WAV attachment named `no_vocals_<filename>`.
pub async fn separate_vocals(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    // A body that is not multipart at all has no audio part either.
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Request is not multipart");
        UploadError::MissingField
    })?;

    let (upload, data) = read_audio_field(&mut multipart).await?;

    let staged_file = state.config.upload_dir.join(&upload.sanitized);
    tokio::fs::write(&staged_file, &data).await?;
    tracing::info!(
        original = %upload.original,
        path = %staged_file.display(),
        bytes = data.len(),
        "Staged upload"
    );

    let token = OutputToken::generate();
    let output_dir = state.config.separated_dir.join(token.as_str());
    tracing::debug!(%token, "Allocated output directory");

    let result = separate_and_respond(&state, &upload, &staged_file, &output_dir).await;

    state.cleanup.schedule(output_dir, staged_file);

    result
}

/// Find the `audio` field, validate its filename and buffer its content.
///
/// Fields with other names are skipped, and so is an `audio` field sent as
/// plain text (no `filename` parameter): only a file part counts as the
/// audio part. A file part with an empty filename is an empty selection.
/// Validation happens before the body of the field is read, so rejected
/// uploads never reach the disk.
async fn read_audio_field(multipart: &mut Multipart) -> AppResult<(AudioUpload, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let Some(filename) = field.file_name() else {
            tracing::debug!("Skipping non-file audio field");
            continue;
        };
        let upload = AudioUpload::from_filename(filename)?;
        let data = field.bytes().await?;
        return Ok((upload, data));
    }

    Err(UploadError::MissingField.into())
}

async fn separate_and_respond(
    state: &AppState,
    upload: &AudioUpload,
    staged_file: &Path,
    output_dir: &Path,
) -> AppResult<Response> {
    tokio::fs::create_dir_all(output_dir).await?;

    let job = SeparationJob::new(staged_file, output_dir, &state.config.model);
    state.separator.separate(&job).await?;

    let result_path = job.locate_result().await?;
    stream_result(&result_path, &upload.download_name()).await
}

/// Stream `path` back as a WAV attachment.
async fn stream_result(path: &Path, download_name: &str) -> AppResult<Response> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();

    tracing::info!(path = %path.display(), length, download_name, "Sending separated track");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, RESULT_CONTENT_TYPE.to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
