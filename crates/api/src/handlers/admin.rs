//! Admin-only maintenance endpoints.

use axum::extract::State;
use axum::Json;
use biodata_core::expiry::SweepReport;
use biodata_core::types::today_utc;

use crate::background::expiry_sweep;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/expiry-sweep
///
/// Runs one sweep immediately, outside the background schedule.
pub async fn run_expiry_sweep(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<SweepReport>>> {
    tracing::info!(user_id = admin.user_id, "On-demand expiry sweep requested");
    let report = expiry_sweep::sweep(&state.pool, today_utc(), &state.sweep_monitor).await?;
    Ok(Json(DataResponse { data: report }))
}
