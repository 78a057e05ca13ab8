use std::sync::Arc;

use crate::background::expiry_sweep::SweepMonitor;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: biodata_db::DbPool,
    /// Server configuration (JWT secret for the auth extractors).
    pub config: Arc<ServerConfig>,
    /// Latest expiry sweep outcome, shared with the background job.
    pub sweep_monitor: Arc<SweepMonitor>,
}
