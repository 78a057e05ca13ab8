//! Profile image attachment model.

use biodata_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `profile_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProfileImage {
    pub id: DbId,
    pub profile_id: DbId,
    /// Relative path returned by the file storage layer.
    pub file_path: String,
    pub is_primary: bool,
    pub sort_order: i32,
    pub created_at: Timestamp,
}
