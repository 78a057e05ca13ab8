//! Shared pieces of the statement builders.
//!
//! [`resolve_fields`] turns a caller's proposed `field -> value` map into an
//! ordered list of `(column, parameter)` assignments: unknown fields are
//! dropped, each survivor runs through its normalizer, and recoverable
//! problems are reported as [`SoftAnomaly`] values instead of errors.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::normalize::{normalize, NormalizedValue, RawValue};
use crate::profile_fields::{find_field, FieldKind, FieldSpec};
use crate::profile_status::{validate_status, STATUS_ACTIVE};
use crate::types::{CalendarDate, DbId};

/// Proposed assignments keyed by the field name the caller used.
///
/// A `BTreeMap` keeps statement construction deterministic.
pub type ProposedFields = BTreeMap<String, RawValue>;

/// Build [`ProposedFields`] from a JSON object body.
pub fn proposed_from_json(map: serde_json::Map<String, serde_json::Value>) -> ProposedFields {
    map.into_iter().map(|(k, v)| (k, RawValue::from(v))).collect()
}

/// A positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(Option<String>),
    Date(Option<CalendarDate>),
    BigInt(DbId),
}

impl SqlParam {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlParam::Text(None) | SqlParam::Date(None))
    }
}

/// What went wrong with a value that was nevertheless accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A date field received something that is not a date; stored as `NULL`.
    MalformedDate,
}

/// A recoverable inconsistency the builder corrected on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftAnomaly {
    pub field: &'static str,
    pub kind: AnomalyKind,
    /// The offending input, for logs.
    pub raw: String,
}

/// Output of [`resolve_fields`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedFields {
    /// `(column, value)` pairs in statement order, at most one per column.
    pub assignments: Vec<(&'static str, SqlParam)>,
    /// Proposed names that are not whitelisted.
    pub ignored: Vec<String>,
    pub anomalies: Vec<SoftAnomaly>,
}

impl ResolvedFields {
    /// The resolved value for `column`, if the caller supplied one.
    pub fn get(&self, column: &str) -> Option<&SqlParam> {
        self.assignments
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, p)| p)
    }

    fn assign(&mut self, column: &'static str, param: SqlParam) {
        match self.assignments.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = param,
            None => self.assignments.push((column, param)),
        }
    }
}

/// Filter `proposed` against the field whitelist and normalize every
/// survivor.
///
/// Aliases that target the same column collapse into one assignment; the
/// name that sorts last wins. Fails only for values that cannot be made
/// valid, such as an unknown approval status.
pub fn resolve_fields(proposed: &ProposedFields) -> Result<ResolvedFields, CoreError> {
    let mut resolved = ResolvedFields::default();

    for (name, raw) in proposed {
        let Some(spec) = find_field(name) else {
            resolved.ignored.push(name.clone());
            continue;
        };
        let normalized = normalize(raw.clone(), spec.name);
        let param = resolve_value(spec, normalized, &mut resolved.anomalies)?;
        resolved.assign(spec.column, param);
    }

    Ok(resolved)
}

fn resolve_value(
    spec: &FieldSpec,
    value: NormalizedValue,
    anomalies: &mut Vec<SoftAnomaly>,
) -> Result<SqlParam, CoreError> {
    match spec.kind {
        FieldKind::Text => Ok(SqlParam::Text(value.into_text())),
        FieldKind::Date => match value {
            NormalizedValue::Date(d) => Ok(SqlParam::Date(Some(d))),
            NormalizedValue::Null => Ok(SqlParam::Date(None)),
            other => {
                anomalies.push(SoftAnomaly {
                    field: spec.column,
                    kind: AnomalyKind::MalformedDate,
                    raw: other.describe(),
                });
                Ok(SqlParam::Date(None))
            }
        },
        FieldKind::Status => {
            let status = lowercase(value).unwrap_or_else(|| STATUS_ACTIVE.to_string());
            validate_status(&status)?;
            Ok(SqlParam::Text(Some(status)))
        }
        FieldKind::Choice(valid) => {
            // Blank means unset; callers decide whether that is allowed.
            let Some(choice) = lowercase(value) else {
                return Ok(SqlParam::Text(None));
            };
            if !valid.contains(&choice.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Invalid {} '{choice}'. Must be one of: {}",
                    spec.name,
                    valid.join(", ")
                )));
            }
            Ok(SqlParam::Text(Some(choice)))
        }
    }
}

fn lowercase(value: NormalizedValue) -> Option<String> {
    value
        .into_text()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}
