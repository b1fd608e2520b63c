use std::sync::Arc;

use vocalstrip_core::separation::Separator;

use crate::background::cleanup::CleanupScheduler;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (directories, model, limits).
    pub config: Arc<ServerConfig>,
    /// Runs the external separation tool.
    pub separator: Arc<dyn Separator>,
    /// Schedules removal of per-request artifacts.
    pub cleanup: CleanupScheduler,
}
