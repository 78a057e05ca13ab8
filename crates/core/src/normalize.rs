//! Field value normalization.
//!
//! Client payloads arrive as loosely-shaped JSON: strings with stray
//! whitespace, single values wrapped in arrays (multipart form fields),
//! dates in several spellings. [`normalize`] reduces any such value to a
//! [`NormalizedValue`] before it is bound into a statement.
//!
//! Date handling is calendar-only and UTC-based: a timestamp is reduced to
//! its UTC calendar day, never to the server's local day.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::profile_fields::{self, FieldKind};
use crate::profile_status::CREATED_BY_SENTINEL;
use crate::types::{CalendarDate, Timestamp};

/// Canonical storage shape for calendar dates.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

static CANONICAL_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// A canonical date followed by a `T` or space separated time component.
static DATE_WITH_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ]").expect("valid regex"));

/// Non-canonical spellings accepted by the generic date parser, tried in order.
///
/// Day-first numeric forms win over month-first ones; biodata is entered
/// with day-first dates.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

// ---------------------------------------------------------------------------
// Value shapes
// ---------------------------------------------------------------------------

/// A raw field value as received from a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    /// An explicit point in time.
    DateTime(Timestamp),
    /// An explicit calendar date.
    Date(CalendarDate),
    /// Array-wrapped value; only the first element is meaningful.
    List(Vec<RawValue>),
    Object(Map<String, Value>),
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => RawValue::Number(n),
            Value::String(s) => RawValue::Text(s),
            Value::Array(items) => RawValue::List(items.into_iter().map(RawValue::from).collect()),
            Value::Object(map) => RawValue::Object(map),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// The result of normalizing a [`RawValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Date(CalendarDate),
    Object(Map<String, Value>),
}

impl NormalizedValue {
    /// Render the value as text for a `TEXT` column. `Null` stays `None`.
    pub fn into_text(self) -> Option<String> {
        match self {
            NormalizedValue::Null => None,
            NormalizedValue::Bool(b) => Some(b.to_string()),
            NormalizedValue::Number(n) => Some(n.to_string()),
            NormalizedValue::Text(s) => Some(s),
            NormalizedValue::Date(d) => Some(format_date(d)),
            NormalizedValue::Object(map) => Some(Value::Object(map).to_string()),
        }
    }

    /// Short description of the value for anomaly reports.
    pub fn describe(&self) -> String {
        match self {
            NormalizedValue::Null => "null".to_string(),
            other => other.clone().into_text().unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Date helpers
// ---------------------------------------------------------------------------

/// Render a calendar date in canonical `YYYY-MM-DD` form.
pub fn format_date(date: CalendarDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// `true` when `value` has the canonical `YYYY-MM-DD` shape.
///
/// Shape only: `2024-02-31` is canonical-looking but not a real date.
pub fn is_canonical_date(value: &str) -> bool {
    CANONICAL_DATE_RE.is_match(value)
}

/// Parse a date-like string into a calendar date.
///
/// Accepts the canonical form, the canonical form followed by a time
/// component (`2024-05-01T10:00:00Z`, `2024-05-01 10:00:00`), RFC 2822
/// timestamps (reduced to their UTC day) and the spellings in
/// [`FALLBACK_DATE_FORMATS`]. Returns `None` when nothing matches.
pub fn parse_date(value: &str) -> Option<CalendarDate> {
    let value = value.trim();

    if is_canonical_date(value) {
        return NaiveDate::parse_from_str(value, CANONICAL_DATE_FORMAT).ok();
    }

    if let Some(caps) = DATE_WITH_TIME_RE.captures(value) {
        return NaiveDate::parse_from_str(&caps[1], CANONICAL_DATE_FORMAT).ok();
    }

    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Some(ts.with_timezone(&chrono::Utc).date_naive());
    }

    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Normalize a raw value destined for `field_name`.
///
/// - Arrays are unwrapped to their first element; an empty array is `Null`.
/// - Strings are trimmed; an empty string becomes `Null`, except for the
///   attribution field which falls back to [`CREATED_BY_SENTINEL`].
/// - For date fields, date/time values become their UTC calendar day and
///   strings are reshaped to a [`NormalizedValue::Date`] when parseable. An
///   unparseable string is passed through as text; callers decide whether
///   that is acceptable.
/// - Everything else passes through unchanged.
pub fn normalize(value: RawValue, field_name: &str) -> NormalizedValue {
    let is_date_field = profile_fields::field_kind(field_name) == Some(FieldKind::Date);
    let is_attribution = field_name == profile_fields::ATTRIBUTION_FIELD;

    match value {
        RawValue::List(items) => match items.into_iter().next() {
            Some(first) => normalize(first, field_name),
            None => NormalizedValue::Null,
        },
        RawValue::Null => NormalizedValue::Null,
        RawValue::DateTime(ts) if is_date_field => NormalizedValue::Date(ts.date_naive()),
        RawValue::DateTime(ts) => NormalizedValue::Text(ts.to_rfc3339()),
        RawValue::Date(d) if is_date_field => NormalizedValue::Date(d),
        RawValue::Date(d) => NormalizedValue::Text(format_date(d)),
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                if is_attribution {
                    NormalizedValue::Text(CREATED_BY_SENTINEL.to_string())
                } else {
                    NormalizedValue::Null
                }
            } else if is_date_field {
                match parse_date(trimmed) {
                    Some(d) => NormalizedValue::Date(d),
                    None => NormalizedValue::Text(trimmed.to_string()),
                }
            } else {
                NormalizedValue::Text(trimmed.to_string())
            }
        }
        RawValue::Bool(b) => NormalizedValue::Bool(b),
        RawValue::Number(n) => NormalizedValue::Number(n),
        RawValue::Object(map) => NormalizedValue::Object(map),
    }
}
