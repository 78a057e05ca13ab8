//! Partial-update statement builder.
//!
//! Produces a parameterized `UPDATE profiles ...` statement from a caller's
//! proposed fields. Column names come only from the field whitelist; values
//! are always bound, never spliced into the statement text.

use crate::error::CoreError;
use crate::plan::{resolve_fields, ProposedFields, SoftAnomaly, SqlParam};
use crate::profile_fields::column_is_nullable;
use crate::profile_status::{validate_can_approve, APPROVAL_APPROVED};
use crate::types::DbId;

/// A ready-to-execute partial update.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub sql: String,
    /// Positional parameters; `params[i]` binds `$i+1`. The record id is last.
    pub params: Vec<SqlParam>,
    /// Columns written, in statement order. Empty for a timestamp-only touch.
    pub columns: Vec<&'static str>,
    /// Proposed names dropped because they are not whitelisted.
    pub ignored_fields: Vec<String>,
    pub anomalies: Vec<SoftAnomaly>,
}

impl UpdatePlan {
    /// `true` when no caller field survived and the statement only refreshes
    /// `updated_at`.
    pub fn is_touch_only(&self) -> bool {
        self.columns.is_empty()
    }

    /// The text bound for `column`, if the plan writes a non-null value there.
    pub fn text_value(&self, column: &str) -> Option<&str> {
        let i = self.columns.iter().position(|c| *c == column)?;
        match &self.params[i] {
            SqlParam::Text(Some(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Apply the payment gate to an edit that approves the profile.
    ///
    /// A payment status written by the same edit counts; otherwise
    /// `current_payment_status` must already be `paid`.
    pub fn check_approval(&self, current_payment_status: &str) -> Result<(), CoreError> {
        if self.text_value("approval_status") != Some(APPROVAL_APPROVED) {
            return Ok(());
        }
        let payment = self
            .text_value("payment_status")
            .unwrap_or(current_payment_status);
        validate_can_approve(payment)
    }
}

/// Build the partial update for profile `id`.
///
/// Every surviving field is written, even if unchanged. When nothing
/// survives the whitelist the plan still refreshes `updated_at`, so an empty
/// edit is never an error. Fails with [`CoreError::Validation`] only for
/// values that cannot be coerced into their field's vocabulary, or that
/// would clear a required column.
pub fn build_update(id: DbId, proposed: &ProposedFields) -> Result<UpdatePlan, CoreError> {
    let resolved = resolve_fields(proposed)?;

    let mut set_clauses = Vec::with_capacity(resolved.assignments.len() + 1);
    let mut params = Vec::with_capacity(resolved.assignments.len() + 1);
    let mut columns = Vec::with_capacity(resolved.assignments.len());

    for (column, param) in resolved.assignments {
        if param.is_null() && !column_is_nullable(column) {
            return Err(CoreError::Validation(format!("{column} must not be empty")));
        }
        params.push(param);
        set_clauses.push(format!("{column} = ${}", params.len()));
        columns.push(column);
    }
    set_clauses.push("updated_at = NOW()".to_string());

    params.push(SqlParam::BigInt(id));
    let sql = format!(
        "UPDATE profiles SET {} WHERE id = ${}",
        set_clauses.join(", "),
        params.len()
    );

    Ok(UpdatePlan {
        sql,
        params,
        columns,
        ignored_fields: resolved.ignored,
        anomalies: resolved.anomalies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::proposed_from_json;
    use chrono::NaiveDate;
    use serde_json::json;

    fn proposed(value: serde_json::Value) -> ProposedFields {
        match value {
            serde_json::Value::Object(map) => proposed_from_json(map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn builds_positional_statement() {
        let plan = build_update(
            9,
            &proposed(json!({"city": " Nashik ", "expiry_date": "2025-01-31T00:00:00Z"})),
        )
        .unwrap();

        assert_eq!(
            plan.sql,
            "UPDATE profiles SET city = $1, expiry_date = $2, updated_at = NOW() WHERE id = $3"
        );
        assert_eq!(
            plan.params,
            vec![
                SqlParam::Text(Some("Nashik".to_string())),
                SqlParam::Date(NaiveDate::from_ymd_opt(2025, 1, 31)),
                SqlParam::BigInt(9),
            ]
        );
        assert_eq!(plan.columns, vec!["city", "expiry_date"]);
    }

    #[test]
    fn statement_never_mentions_unknown_fields() {
        let plan = build_update(
            1,
            &proposed(json!({
                "city": "Pune",
                "password_hash": "x",
                "city; DROP TABLE profiles": "y",
            })),
        )
        .unwrap();

        assert!(!plan.sql.contains("password_hash"));
        assert!(!plan.sql.contains("DROP"));
        assert_eq!(plan.ignored_fields.len(), 2);
        assert_eq!(plan.params.len(), 2);
    }

    #[test]
    fn empty_payload_touches_timestamp_only() {
        let plan = build_update(5, &ProposedFields::new()).unwrap();
        assert!(plan.is_touch_only());
        assert_eq!(plan.sql, "UPDATE profiles SET updated_at = NOW() WHERE id = $1");
        assert_eq!(plan.params, vec![SqlParam::BigInt(5)]);
    }

    #[test]
    fn fully_filtered_payload_touches_timestamp_only() {
        let plan = build_update(5, &proposed(json!({"registration_code": "X", "id": 2}))).unwrap();
        assert!(plan.is_touch_only());
        assert_eq!(plan.ignored_fields.len(), 2);
    }

    #[test]
    fn empty_expiry_becomes_null_not_empty_string() {
        let plan = build_update(3, &proposed(json!({"expiry_date": ""}))).unwrap();
        assert_eq!(plan.params[0], SqlParam::Date(None));
    }

    #[test]
    fn status_is_trimmed_and_lowercased() {
        let plan = build_update(3, &proposed(json!({"status": "ACTIVE  "}))).unwrap();
        assert_eq!(plan.params[0], SqlParam::Text(Some("active".to_string())));
    }

    #[test]
    fn clearing_full_name_is_rejected() {
        let result = build_update(3, &proposed(json!({"full_name": "   "})));
        assert!(matches!(result, Err(CoreError::Validation(msg)) if msg.contains("full_name")));
    }

    #[test]
    fn clearing_payment_status_is_rejected() {
        let result = build_update(3, &proposed(json!({"payment_status": ""})));
        assert!(matches!(
            result,
            Err(CoreError::Validation(msg)) if msg == "payment_status must not be empty"
        ));
    }

    #[test]
    fn approving_edit_is_gated_on_payment() {
        let plan = build_update(3, &proposed(json!({"approval_status": "Approved"}))).unwrap();
        assert!(matches!(
            plan.check_approval("unpaid"),
            Err(CoreError::Conflict(_))
        ));
        assert!(plan.check_approval("paid").is_ok());

        let paid_together = build_update(
            3,
            &proposed(json!({"approval_status": "approved", "payment_status": "paid"})),
        )
        .unwrap();
        assert!(paid_together.check_approval("unpaid").is_ok());

        let rejecting = build_update(3, &proposed(json!({"approval_status": "rejected"}))).unwrap();
        assert!(rejecting.check_approval("unpaid").is_ok());
    }

    #[test]
    fn unchanged_values_are_still_written() {
        let fields = proposed(json!({"religion": "Hindu"}));
        let first = build_update(4, &fields).unwrap();
        let second = build_update(4, &fields).unwrap();
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.columns, vec!["religion"]);
    }
}
