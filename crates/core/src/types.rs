/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates (`DATE` columns) carry no time zone.
pub type CalendarDate = chrono::NaiveDate;

/// Today's calendar date in UTC.
///
/// Every date comparison in the registry (default expiry, the sweep cutoff)
/// goes through this so the whole system agrees on one day boundary.
pub fn today_utc() -> CalendarDate {
    chrono::Utc::now().date_naive()
}
