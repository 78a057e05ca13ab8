//! Insert-path profile construction.
//!
//! [`build_insert`] turns registration input into a single `INSERT`
//! statement that always carries the derived and defaulted columns: the
//! registration code, a non-empty display name, creator attribution, initial
//! workflow statuses and an initial expiry date.
//!
//! Registration codes look like `BD-20261019-48213`: a fixed prefix, the UTC
//! registration date and a random five-digit suffix. Uniqueness is enforced
//! by the `uq_profiles_registration_code` constraint; the statement skips the
//! insert on a collision so the caller can retry with a fresh code.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::CoreError;
use crate::plan::{resolve_fields, ProposedFields, SoftAnomaly, SqlParam};
use crate::profile_fields::{find_field, is_control_field};
use crate::profile_status::{
    resolve_attribution, validate_channel, APPROVAL_PENDING, CHANNEL_SELF, PAYMENT_UNPAID,
    STATUS_ACTIVE,
};
use crate::types::CalendarDate;

/// Prefix of every registration code.
pub const REGISTRATION_CODE_PREFIX: &str = "BD";

/// How many fresh codes a registration tries before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

static REGISTRATION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BD-\d{8}-\d{5}$").expect("valid regex"));

/// Generate a registration code for a profile registered on `date`.
pub fn generate_registration_code(date: CalendarDate) -> String {
    let suffix: u32 = rand::rng().random_range(10_000..100_000);
    format!(
        "{REGISTRATION_CODE_PREFIX}-{}-{suffix}",
        date.format("%Y%m%d")
    )
}

/// `true` if `code` has the registration code shape.
pub fn is_registration_code(code: &str) -> bool {
    REGISTRATION_CODE_RE.is_match(code)
}

/// Derive the display name.
///
/// An explicit full name wins; otherwise first and last name are joined;
/// otherwise the registration code stands in, so the result is never empty.
pub fn derive_full_name(
    full_name: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    registration_code: &str,
) -> String {
    if let Some(full) = full_name.map(str::trim).filter(|s| !s.is_empty()) {
        return full.to_string();
    }
    let joined = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        registration_code.to_string()
    } else {
        joined
    }
}

/// Everything the insert needs besides the caller's proposed fields.
#[derive(Debug, Clone)]
pub struct RegistrationContext<'a> {
    pub registration_code: String,
    /// One of the registration channels (`self`, `admin`, `agent`).
    pub channel: &'a str,
    /// Stored path of the primary photo, from the file storage collaborator.
    pub attachment_path: Option<&'a str>,
    /// Name of the acting user, if any.
    pub attribution: Option<&'a str>,
    /// Registration day; the default expiry date.
    pub today: CalendarDate,
}

/// A ready-to-execute profile insert.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub columns: Vec<&'static str>,
    /// Positional parameters matching `columns`.
    pub params: Vec<SqlParam>,
    pub ignored_fields: Vec<String>,
    pub anomalies: Vec<SoftAnomaly>,
    name_derived_from_code: bool,
}

impl InsertPlan {
    /// The statement text. Returns the new `id`, or no row when the
    /// registration code collided with an existing one.
    pub fn sql(&self) -> String {
        let placeholders = (1..=self.params.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO profiles ({}) VALUES ({placeholders}) \
             ON CONFLICT ON CONSTRAINT uq_profiles_registration_code DO NOTHING \
             RETURNING id",
            self.columns.join(", ")
        )
    }

    /// The registration code currently bound.
    pub fn registration_code(&self) -> &str {
        match self.param("registration_code") {
            Some(SqlParam::Text(Some(code))) => code,
            _ => "",
        }
    }

    /// Rebind a fresh registration code after a collision.
    ///
    /// A display name that fell back to the old code follows the new one.
    pub fn set_registration_code(&mut self, code: String) {
        if self.name_derived_from_code {
            self.set("full_name", SqlParam::Text(Some(code.clone())));
        }
        self.set("registration_code", SqlParam::Text(Some(code)));
    }

    /// The bound value for `column`.
    pub fn param(&self, column: &str) -> Option<&SqlParam> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .map(|i| &self.params[i])
    }

    fn set(&mut self, column: &'static str, param: SqlParam) {
        match self.columns.iter().position(|c| *c == column) {
            Some(i) => self.params[i] = param,
            None => {
                self.columns.push(column);
                self.params.push(param);
            }
        }
    }
}

fn text_of(param: Option<&SqlParam>) -> Option<&str> {
    match param {
        Some(SqlParam::Text(Some(s))) => Some(s.as_str()),
        _ => None,
    }
}

/// Split `proposed` into the fields an insert on `channel` may write and the
/// names it withholds.
///
/// `status` is never taken from the caller. A self-service registration
/// cannot set any control attribute; staff channels may preset approval,
/// payment and expiry.
fn insertable_fields(proposed: &ProposedFields, channel: &str) -> (ProposedFields, Vec<String>) {
    let mut accepted = ProposedFields::new();
    let mut withheld = Vec::new();
    for (name, raw) in proposed {
        let forced = find_field(name).is_some_and(|f| f.column == "status");
        if forced || (channel == CHANNEL_SELF && is_control_field(name)) {
            withheld.push(name.clone());
        } else {
            accepted.insert(name.clone(), raw.clone());
        }
    }
    (accepted, withheld)
}

/// Build the insert for a new registration.
///
/// Defaults applied on top of the proposed fields:
/// - `approval_status = pending` and `payment_status = unpaid` unless a
///   staff channel gave a value.
/// - `status = active`, always.
/// - `expiry_date = ctx.today` unless a staff channel gave a valid date.
/// - `created_by` = the attribution or the sentinel, never empty.
/// - `photo_path` = `ctx.attachment_path` when an upload accompanied the form.
pub fn build_insert(
    proposed: &ProposedFields,
    ctx: &RegistrationContext<'_>,
) -> Result<InsertPlan, CoreError> {
    validate_channel(ctx.channel)?;
    let (accepted, withheld) = insertable_fields(proposed, ctx.channel);
    let resolved = resolve_fields(&accepted)?;

    let mut ignored_fields = resolved.ignored.clone();
    ignored_fields.extend(withheld);
    ignored_fields.sort();

    let mut plan = InsertPlan {
        columns: Vec::with_capacity(resolved.assignments.len() + 6),
        params: Vec::with_capacity(resolved.assignments.len() + 6),
        ignored_fields,
        anomalies: resolved.anomalies.clone(),
        name_derived_from_code: false,
    };

    plan.set(
        "registration_code",
        SqlParam::Text(Some(ctx.registration_code.clone())),
    );
    for (column, param) in &resolved.assignments {
        plan.set(*column, param.clone());
    }

    let full_name = derive_full_name(
        text_of(resolved.get("full_name")),
        text_of(resolved.get("first_name")),
        text_of(resolved.get("last_name")),
        &ctx.registration_code,
    );
    plan.name_derived_from_code = full_name == ctx.registration_code;
    plan.set("full_name", SqlParam::Text(Some(full_name)));

    if text_of(resolved.get("approval_status")).is_none() {
        plan.set(
            "approval_status",
            SqlParam::Text(Some(APPROVAL_PENDING.to_string())),
        );
    }
    if text_of(resolved.get("payment_status")).is_none() {
        plan.set(
            "payment_status",
            SqlParam::Text(Some(PAYMENT_UNPAID.to_string())),
        );
    }
    plan.set("status", SqlParam::Text(Some(STATUS_ACTIVE.to_string())));

    if !matches!(resolved.get("expiry_date"), Some(SqlParam::Date(Some(_)))) {
        plan.set("expiry_date", SqlParam::Date(Some(ctx.today)));
    }

    if let Some(path) = ctx.attachment_path.map(str::trim).filter(|p| !p.is_empty()) {
        plan.set("photo_path", SqlParam::Text(Some(path.to_string())));
    }

    plan.set(
        "registration_channel",
        SqlParam::Text(Some(ctx.channel.to_string())),
    );
    plan.set(
        "created_by",
        SqlParam::Text(Some(resolve_attribution(ctx.attribution))),
    );

    Ok(plan)
}
