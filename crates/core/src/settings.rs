//! Application settings keys and value validation.
//!
//! Settings are a flat key/value store edited by administrators. Only the
//! keys listed here may be written; a batch containing any other key is
//! rejected before it reaches storage.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::expiry::{DEFAULT_VALIDITY_DAYS, MAX_VALIDITY_DAYS};

/// Days of validity granted when a profile is approved.
pub const KEY_PROFILE_VALIDITY_DAYS: &str = "profile_validity_days";

/// Whether the public registration form accepts submissions (`true`/`false`).
pub const KEY_REGISTRATION_OPEN: &str = "registration_open";

pub const KEY_CONTACT_EMAIL: &str = "contact_email";

pub const KEY_SITE_NAME: &str = "site_name";

/// All writable setting keys.
pub const VALID_SETTING_KEYS: &[&str] = &[
    KEY_PROFILE_VALIDITY_DAYS,
    KEY_REGISTRATION_OPEN,
    KEY_CONTACT_EMAIL,
    KEY_SITE_NAME,
];

/// Maximum length of any setting value.
pub const MAX_SETTING_VALUE_LEN: usize = 500;

/// Validate one `key = value` pair, returning the trimmed value to store.
pub fn validate_setting(key: &str, value: &str) -> Result<String, CoreError> {
    if !VALID_SETTING_KEYS.contains(&key) {
        return Err(CoreError::Validation(format!(
            "Unknown setting '{key}'. Must be one of: {}",
            VALID_SETTING_KEYS.join(", ")
        )));
    }

    let value = value.trim();
    if value.len() > MAX_SETTING_VALUE_LEN {
        return Err(CoreError::Validation(format!(
            "Setting '{key}' exceeds {MAX_SETTING_VALUE_LEN} characters"
        )));
    }

    match key {
        KEY_PROFILE_VALIDITY_DAYS => {
            let days: u32 = value.parse().map_err(|_| {
                CoreError::Validation(format!("{key} must be a whole number of days"))
            })?;
            if days == 0 || days > MAX_VALIDITY_DAYS {
                return Err(CoreError::Validation(format!(
                    "{key} must be between 1 and {MAX_VALIDITY_DAYS}"
                )));
            }
        }
        KEY_REGISTRATION_OPEN => {
            if value != "true" && value != "false" {
                return Err(CoreError::Validation(format!(
                    "{key} must be 'true' or 'false'"
                )));
            }
        }
        KEY_CONTACT_EMAIL => {
            if !value.contains('@') {
                return Err(CoreError::Validation(format!(
                    "{key} must be an email address"
                )));
            }
        }
        _ => {
            if value.is_empty() {
                return Err(CoreError::Validation(format!("{key} must not be empty")));
            }
        }
    }

    Ok(value.to_string())
}

/// Validate a whole batch. Fails on the first bad entry, so nothing is
/// written unless every key is acceptable.
pub fn validate_settings(
    batch: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, CoreError> {
    if batch.is_empty() {
        return Err(CoreError::Validation("No settings provided".to_string()));
    }
    batch
        .iter()
        .map(|(k, v)| validate_setting(k, v).map(|v| (k.clone(), v)))
        .collect()
}

/// Read the validity period from a stored value, falling back to the default
/// when absent or unparseable.
pub fn validity_days(stored: Option<&str>) -> u32 {
    stored
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|d| (1..=MAX_VALIDITY_DAYS).contains(d))
        .unwrap_or(DEFAULT_VALIDITY_DAYS)
}
