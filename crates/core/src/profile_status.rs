//! Profile control-attribute vocabularies and validation helpers.
//!
//! Defines the accepted values for the four control attributes of a profile
//! (`status`, `approval_status`, `payment_status`, `created_by`) and the
//! registration channels. Must match the CHECK constraints in
//! `20261001000001_create_profiles.sql`.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Visibility status
// ---------------------------------------------------------------------------

/// Profile is visible and within its validity period.
pub const STATUS_ACTIVE: &str = "active";

/// Profile has lapsed or was hidden by staff.
pub const STATUS_INACTIVE: &str = "inactive";

/// All valid visibility status values.
pub const VALID_STATUSES: &[&str] = &[STATUS_ACTIVE, STATUS_INACTIVE];

// ---------------------------------------------------------------------------
// Approval workflow
// ---------------------------------------------------------------------------

pub const APPROVAL_PENDING: &str = "pending";
pub const APPROVAL_APPROVED: &str = "approved";
pub const APPROVAL_REJECTED: &str = "rejected";

/// Soft-delete tombstone. Rows carrying it are never physically removed and
/// are hidden from listings and statistics unless explicitly requested.
pub const APPROVAL_DELETED: &str = "deleted";

/// All valid approval status values.
pub const VALID_APPROVAL_STATUSES: &[&str] = &[
    APPROVAL_PENDING,
    APPROVAL_APPROVED,
    APPROVAL_REJECTED,
    APPROVAL_DELETED,
];

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

pub const PAYMENT_PAID: &str = "paid";
pub const PAYMENT_UNPAID: &str = "unpaid";

/// All valid payment status values.
pub const VALID_PAYMENT_STATUSES: &[&str] = &[PAYMENT_PAID, PAYMENT_UNPAID];

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

/// Attribution recorded when no authenticated actor created the profile.
pub const CREATED_BY_SENTINEL: &str = "system";

/// Resolve an optional actor name into the attribution that gets persisted.
///
/// Blank or missing names collapse to [`CREATED_BY_SENTINEL`], so the result
/// is never empty.
pub fn resolve_attribution(actor: Option<&str>) -> String {
    match actor.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => CREATED_BY_SENTINEL.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Registration channels
// ---------------------------------------------------------------------------

/// The user filled in the public registration form.
pub const CHANNEL_SELF: &str = "self";

/// An administrator entered the biodata.
pub const CHANNEL_ADMIN: &str = "admin";

/// A field agent entered the biodata on the user's behalf.
pub const CHANNEL_AGENT: &str = "agent";

/// All valid registration channels.
pub const VALID_CHANNELS: &[&str] = &[CHANNEL_SELF, CHANNEL_ADMIN, CHANNEL_AGENT];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_one_of(kind: &str, value: &str, valid: &[&str]) -> Result<(), CoreError> {
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid {kind} '{value}'. Must be one of: {}",
            valid.join(", ")
        )))
    }
}

/// Validate a visibility status (`active` / `inactive`).
pub fn validate_status(value: &str) -> Result<(), CoreError> {
    validate_one_of("status", value, VALID_STATUSES)
}

/// Validate an approval status.
pub fn validate_approval_status(value: &str) -> Result<(), CoreError> {
    validate_one_of("approval_status", value, VALID_APPROVAL_STATUSES)
}

/// Validate a payment status.
pub fn validate_payment_status(value: &str) -> Result<(), CoreError> {
    validate_one_of("payment_status", value, VALID_PAYMENT_STATUSES)
}

/// Validate a registration channel.
pub fn validate_channel(value: &str) -> Result<(), CoreError> {
    validate_one_of("registration_channel", value, VALID_CHANNELS)
}

/// Approval is gated on payment: only paid profiles may be approved.
pub fn validate_can_approve(payment_status: &str) -> Result<(), CoreError> {
    if payment_status == PAYMENT_PAID {
        Ok(())
    } else {
        Err(CoreError::Conflict(
            "Profile cannot be approved until payment is recorded".to_string(),
        ))
    }
}
