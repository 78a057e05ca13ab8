//! Profile field schema.
//!
//! The closed whitelist of fields a caller may write, mapping each accepted
//! field name to its storage column, normalizer and nullability. Statement
//! builders iterate this table; a name that is not here never reaches SQL.

use crate::profile_status::{VALID_APPROVAL_STATUSES, VALID_PAYMENT_STATUSES};

/// Name of the attribution field. Not writable through updates; set once on
/// insert from the acting user or the sentinel.
pub const ATTRIBUTION_FIELD: &str = "created_by";

/// Normalizer applied to a field before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed text; empty becomes `NULL`.
    Text,
    /// Calendar date; malformed input degrades to `NULL`.
    Date,
    /// Visibility status; lower-cased, empty defaults to `active`.
    Status,
    /// Lower-cased value restricted to a fixed vocabulary.
    Choice(&'static [&'static str]),
}

/// One whitelisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name accepted from callers.
    pub name: &'static str,
    /// Column in the `profiles` table.
    pub column: &'static str,
    pub kind: FieldKind,
    /// Whether the column accepts `NULL`.
    pub nullable: bool,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        column: name,
        kind: FieldKind::Text,
        nullable: true,
    }
}

const fn required_text(name: &'static str) -> FieldSpec {
    FieldSpec {
        nullable: false,
        ..text(name)
    }
}

const fn alias(name: &'static str, target: FieldSpec) -> FieldSpec {
    FieldSpec { name, ..target }
}

const DATE_OF_BIRTH: FieldSpec = FieldSpec {
    name: "date_of_birth",
    column: "date_of_birth",
    kind: FieldKind::Date,
    nullable: true,
};

const PHONE: FieldSpec = text("phone");
const PHOTO_PATH: FieldSpec = text("photo_path");

/// Every field a profile edit may touch, including the staff-controlled
/// status attributes.
pub const PROFILE_FIELDS: &[FieldSpec] = &[
    // Identity
    required_text("full_name"),
    text("first_name"),
    text("middle_name"),
    text("last_name"),
    text("gender"),
    DATE_OF_BIRTH,
    alias("dob", DATE_OF_BIRTH),
    text("birth_time"),
    text("birth_place"),
    // Physical
    text("height"),
    text("weight"),
    text("complexion"),
    text("blood_group"),
    // Community
    text("marital_status"),
    text("religion"),
    text("caste"),
    text("sub_caste"),
    text("gotra"),
    text("rashi"),
    text("nakshatra"),
    text("manglik"),
    text("mother_tongue"),
    text("nationality"),
    // Education and career
    text("education"),
    text("occupation"),
    text("employer"),
    text("annual_income"),
    // Family
    text("father_name"),
    text("father_occupation"),
    text("mother_name"),
    text("mother_occupation"),
    text("brothers"),
    text("sisters"),
    text("family_type"),
    // Contact
    PHONE,
    alias("mobile", PHONE),
    text("alternate_phone"),
    text("email"),
    text("address"),
    text("city"),
    text("state"),
    text("country"),
    text("pincode"),
    // Free text
    text("about_me"),
    text("hobbies"),
    text("partner_expectations"),
    // Media
    PHOTO_PATH,
    alias("photo", PHOTO_PATH),
    // Control attributes
    FieldSpec {
        name: "status",
        column: "status",
        kind: FieldKind::Status,
        nullable: false,
    },
    FieldSpec {
        name: "approval_status",
        column: "approval_status",
        kind: FieldKind::Choice(VALID_APPROVAL_STATUSES),
        nullable: false,
    },
    FieldSpec {
        name: "payment_status",
        column: "payment_status",
        kind: FieldKind::Choice(VALID_PAYMENT_STATUSES),
        nullable: false,
    },
    FieldSpec {
        name: "expiry_date",
        column: "expiry_date",
        kind: FieldKind::Date,
        nullable: true,
    },
];

/// Look up a whitelisted field by the name a caller used.
pub fn find_field(name: &str) -> Option<&'static FieldSpec> {
    PROFILE_FIELDS.iter().find(|f| f.name == name)
}

/// Whether `column` accepts `NULL`. Unknown columns report `false`.
pub fn column_is_nullable(column: &str) -> bool {
    PROFILE_FIELDS
        .iter()
        .find(|f| f.column == column)
        .is_some_and(|f| f.nullable)
}

/// Workflow and lifecycle columns only staff may set on a new profile.
pub const CONTROL_COLUMNS: &[&str] = &["status", "approval_status", "payment_status", "expiry_date"];

/// Whether `name` (or the column it aliases) is a control attribute.
pub fn is_control_field(name: &str) -> bool {
    find_field(name).is_some_and(|f| CONTROL_COLUMNS.contains(&f.column))
}

/// The normalizer kind for `name`, if it is whitelisted.
pub fn field_kind(name: &str) -> Option<FieldKind> {
    find_field(name).map(|f| f.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let mut seen = HashSet::new();
        for field in PROFILE_FIELDS {
            assert!(seen.insert(field.name), "duplicate field name {}", field.name);
        }
    }

    #[test]
    fn aliases_share_columns() {
        assert_eq!(find_field("dob").unwrap().column, "date_of_birth");
        assert_eq!(find_field("mobile").unwrap().column, "phone");
        assert_eq!(find_field("photo").unwrap().column, "photo_path");
    }

    #[test]
    fn both_date_fields_are_dates() {
        assert_eq!(field_kind("date_of_birth"), Some(FieldKind::Date));
        assert_eq!(field_kind("expiry_date"), Some(FieldKind::Date));
    }

    #[test]
    fn display_name_cannot_be_cleared() {
        assert!(!column_is_nullable("full_name"));
        assert!(column_is_nullable("middle_name"));
        assert!(column_is_nullable("expiry_date"));
    }

    #[test]
    fn control_fields_are_recognised() {
        for name in ["status", "approval_status", "payment_status", "expiry_date"] {
            assert!(is_control_field(name), "{name}");
        }
        assert!(!is_control_field("city"));
        assert!(!is_control_field("bogus"));
    }

    #[test]
    fn server_managed_columns_are_not_writable() {
        for name in ["id", "registration_code", "created_by", "created_at", "updated_at"] {
            assert!(find_field(name).is_none(), "{name} must not be whitelisted");
        }
    }

    #[test]
    fn columns_are_plain_identifiers() {
        for field in PROFILE_FIELDS {
            assert!(
                field.column.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "column {} is not a plain identifier",
                field.column
            );
        }
    }
}
