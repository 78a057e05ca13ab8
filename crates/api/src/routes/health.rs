//! Liveness and readiness for the registry.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::background::expiry_sweep::SweepStatus;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable or the expiry
    /// sweep keeps failing.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Newest applied migration. `None` when the database cannot be read.
    pub schema_version: Option<i64>,
    pub expiry_sweep: SweepStatus,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = biodata_db::health_check(&state.pool).await.is_ok();
    let schema_version = if db_healthy {
        biodata_db::schema_version(&state.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Could not read schema version");
                None
            })
    } else {
        None
    };
    let expiry_sweep = state.sweep_monitor.snapshot().await;

    let status = if db_healthy && !expiry_sweep.is_failing() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        schema_version,
        expiry_sweep,
    })
}

/// Mounted at the root, outside `/api/v1`, so probes need no token.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
