//! Profile entity model and DTOs.

use biodata_core::plan::SoftAnomaly;
use biodata_core::types::{CalendarDate, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A profile row from the `profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub id: DbId,
    pub registration_code: String,

    pub full_name: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<CalendarDate>,
    pub birth_time: Option<String>,
    pub birth_place: Option<String>,

    pub height: Option<String>,
    pub weight: Option<String>,
    pub complexion: Option<String>,
    pub blood_group: Option<String>,

    pub marital_status: Option<String>,
    pub religion: Option<String>,
    pub caste: Option<String>,
    pub sub_caste: Option<String>,
    pub gotra: Option<String>,
    pub rashi: Option<String>,
    pub nakshatra: Option<String>,
    pub manglik: Option<String>,
    pub mother_tongue: Option<String>,
    pub nationality: Option<String>,

    pub education: Option<String>,
    pub occupation: Option<String>,
    pub employer: Option<String>,
    pub annual_income: Option<String>,

    pub father_name: Option<String>,
    pub father_occupation: Option<String>,
    pub mother_name: Option<String>,
    pub mother_occupation: Option<String>,
    pub brothers: Option<String>,
    pub sisters: Option<String>,
    pub family_type: Option<String>,

    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,

    pub about_me: Option<String>,
    pub hobbies: Option<String>,
    pub partner_expectations: Option<String>,

    pub photo_path: Option<String>,

    /// `self`, `admin` or `agent`.
    pub registration_channel: String,
    /// `active` or `inactive`.
    pub status: String,
    /// `pending`, `approved`, `rejected` or the `deleted` tombstone.
    pub approval_status: String,
    /// `paid` or `unpaid`.
    pub payment_status: String,
    pub expiry_date: Option<CalendarDate>,
    /// Never empty; `system` when no authenticated actor registered it.
    pub created_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Filters for listing profiles (`?approval_status=&status=&...`).
///
/// Tombstoned profiles are excluded unless `approval_status` is `deleted`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFilter {
    pub approval_status: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub gender: Option<String>,
    /// Case-insensitive match on name, registration code or city.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One page of a profile listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub items: Vec<Profile>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Aggregate counts over non-tombstoned profiles.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct ProfileStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub paid: i64,
    pub unpaid: i64,
    /// Active profiles whose expiry falls within the next seven days.
    pub expiring_soon: i64,
}

/// Registration inputs that do not come from the form fields.
#[derive(Debug, Clone, Default)]
pub struct RegistrationMeta {
    /// `self`, `admin` or `agent`.
    pub channel: String,
    /// Stored image paths; the first one becomes the primary photo.
    pub attachments: Vec<String>,
    /// Name of the acting user, if authenticated.
    pub attribution: Option<String>,
}

/// Result of a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedProfile {
    pub id: DbId,
    pub registration_code: String,
}

/// Result of a partial update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub success: bool,
    /// Zero when the row vanished between the existence check and the write.
    pub affected_rows: u64,
    pub applied_fields: Vec<&'static str>,
    pub ignored_fields: Vec<String>,
    pub anomalies: Vec<SoftAnomaly>,
}
