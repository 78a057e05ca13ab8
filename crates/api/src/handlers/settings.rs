//! Handlers for `/admin/settings`.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use biodata_core::settings::validate_settings;
use biodata_db::models::setting::AppSetting;
use biodata_db::repositories::SettingRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/settings
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<AppSetting>>>> {
    let settings = SettingRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/admin/settings
///
/// Body is a flat `{ "key": "value" }` object. The whole batch is validated
/// before anything is written, then upserted in one transaction.
pub async fn bulk_update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(batch): Json<BTreeMap<String, String>>,
) -> AppResult<Json<DataResponse<Vec<AppSetting>>>> {
    let validated = validate_settings(&batch)?;
    let written = SettingRepo::bulk_upsert(&state.pool, &validated).await?;
    tracing::info!(
        user_id = admin.user_id,
        keys = ?validated.keys().collect::<Vec<_>>(),
        "Settings updated"
    );
    Ok(Json(DataResponse { data: written }))
}
