//! Application setting model.

use biodata_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `app_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: Timestamp,
}
