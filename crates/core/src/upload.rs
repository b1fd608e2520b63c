//! Upload validation and on-disk naming.
//!
//! An upload is accepted when its filename is non-empty and ends in one of
//! [`ALLOWED_EXTENSIONS`]. The accepted name is then reduced by
//! [`secure_filename`] to something that can be joined onto the staging
//! directory without escaping it.

use unicode_normalization::UnicodeNormalization;

use crate::error::UploadError;

/// Audio container extensions the separation tool is known to decode.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac", "ogg"];

/// Filename of the non-vocal stem written by the separation tool.
pub const NO_VOCALS_FILENAME: &str = "no_vocals.wav";

/// Prefix of the filename offered to the client for download.
pub const DOWNLOAD_PREFIX: &str = "no_vocals_";

/// A validated upload filename, in both its submitted and sanitized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    /// Filename exactly as the client submitted it.
    pub original: String,
    /// Safe on-disk name, used for staging and the download name.
    pub sanitized: String,
}

impl AudioUpload {
    /// Validate a submitted filename.
    ///
    /// Checks run in order and stop at the first failure: empty name, then
    /// extension. The sanitized name must keep an allowed extension too,
    /// so `".mp3"` (which sanitizes to `"mp3"`) is rejected.
    pub fn from_filename(filename: &str) -> Result<Self, UploadError> {
        if filename.is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        if !has_allowed_extension(filename) {
            return Err(UploadError::UnsupportedType);
        }

        let sanitized = secure_filename(filename);
        if sanitized.is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        if !has_allowed_extension(&sanitized) {
            return Err(UploadError::UnsupportedType);
        }

        Ok(Self {
            original: filename.to_string(),
            sanitized,
        })
    }

    /// Sanitized name with its final extension removed (`song.mp3` -> `song`).
    ///
    /// The separation tool names its per-track output directory after this.
    pub fn stem(&self) -> &str {
        file_stem(&self.sanitized)
    }

    /// Name the result is offered under: `no_vocals_<sanitized>`.
    pub fn download_name(&self) -> String {
        format!("{DOWNLOAD_PREFIX}{}", self.sanitized)
    }
}

/// Whether `filename` ends in one of [`ALLOWED_EXTENSIONS`] (case-insensitive).
///
/// A name without any `.` has no extension and is never allowed.
pub fn has_allowed_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Reduce a client-supplied filename to a safe, flat, ASCII name.
///
/// - Unicode is NFKD-decomposed and what remains outside ASCII is dropped,
///   so accented letters keep their base letter (`café` -> `cafe`)
/// - `/` becomes whitespace, so directory components cannot survive as such
/// - whitespace runs collapse to a single `_`
/// - anything outside `[A-Za-z0-9_.-]` is dropped
/// - leading and trailing `.` / `_` are trimmed
///
/// The result may be empty; callers must reject that.
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Strip the final extension from `filename`.
///
/// A leading dot is part of the name, not an extension separator.
pub fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}
