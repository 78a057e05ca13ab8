//! Profile validity and the expiry sweep contract.
//!
//! A profile whose `expiry_date` lies strictly before today's UTC calendar
//! date, and whose `status` is `active` or unset, lapses to `inactive`. The
//! transition only runs in that direction; reactivation is a staff edit.

use std::time::Duration;

use chrono::Days;
use serde::Serialize;

use crate::profile_status::STATUS_ACTIVE;
use crate::types::{CalendarDate, DbId};

/// Default interval between sweeps: 6 hours.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// Validity granted on approval when no setting overrides it.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Upper bound on a configured validity period (ten years).
pub const MAX_VALIDITY_DAYS: u32 = 3650;

/// Whether a profile is due to lapse on `today`.
///
/// A profile expiring today is still valid; it lapses on the following day.
pub fn is_expired(expiry_date: Option<CalendarDate>, status: Option<&str>, today: CalendarDate) -> bool {
    let eligible = match status.map(str::trim) {
        None | Some("") => true,
        Some(s) => s == STATUS_ACTIVE,
    };
    eligible && expiry_date.is_some_and(|d| d < today)
}

/// The expiry date granted by an approval on `today`.
pub fn renewed_expiry(today: CalendarDate, validity_days: u32) -> CalendarDate {
    today
        .checked_add_days(Days::new(u64::from(validity_days)))
        .unwrap_or(CalendarDate::MAX)
}

/// Result of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub updated_count: u64,
    pub affected_ids: Vec<DbId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.updated_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> CalendarDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn past_expiry_on_active_profile_lapses() {
        assert!(is_expired(Some(d(2026, 10, 18)), Some("active"), d(2026, 10, 19)));
    }

    #[test]
    fn unset_status_is_treated_as_active() {
        assert!(is_expired(Some(d(2026, 1, 1)), None, d(2026, 10, 19)));
        assert!(is_expired(Some(d(2026, 1, 1)), Some(""), d(2026, 10, 19)));
    }

    #[test]
    fn expiring_today_is_still_valid() {
        assert!(!is_expired(Some(d(2026, 10, 19)), Some("active"), d(2026, 10, 19)));
    }

    #[test]
    fn inactive_and_undated_profiles_are_never_selected() {
        assert!(!is_expired(Some(d(2020, 1, 1)), Some("inactive"), d(2026, 10, 19)));
        assert!(!is_expired(None, Some("active"), d(2026, 10, 19)));
    }

    #[test]
    fn renewal_adds_validity_days() {
        assert_eq!(renewed_expiry(d(2026, 10, 19), 365), d(2027, 10, 19));
        assert_eq!(renewed_expiry(d(2026, 10, 19), 0), d(2026, 10, 19));
    }
}
