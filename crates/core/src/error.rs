/// Client-side upload problems, detected before anything touches disk.
///
/// The `Display` strings are returned verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("No audio part in the request.")]
    MissingField,

    #[error("No file selected for uploading.")]
    EmptyFilename,

    #[error("Unsupported file type.")]
    UnsupportedType,
}
