pub mod health;
pub mod separate;

use axum::Router;

use crate::state::AppState;

/// Build the full route tree.
///
/// ```text
/// /health       GET   liveness
/// /separate     POST  vocal removal
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(separate::router())
}
