use axum::routing::post;
use axum::Router;

use crate::handlers::separate;
use crate::state::AppState;

/// Mount the separation endpoint.
///
/// ```text
/// POST /separate      multipart `audio` -> no_vocals WAV attachment
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/separate", post(separate::separate_vocals))
}
