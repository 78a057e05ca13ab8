//! Repository for the `profiles` table.
//!
//! Writes go through statement plans built in `biodata_core`; this module
//! binds their positional parameters, runs them, and logs the soft anomalies
//! and ignored fields the plans report.

use biodata_core::error::CoreError;
use biodata_core::expiry::{is_expired, renewed_expiry, SweepReport};
use biodata_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use biodata_core::plan::{ProposedFields, SoftAnomaly, SqlParam};
use biodata_core::profile_status::{validate_can_approve, APPROVAL_DELETED};
use biodata_core::registration::{
    build_insert, generate_registration_code, InsertPlan, RegistrationContext, MAX_CODE_ATTEMPTS,
};
use biodata_core::types::{today_utc, CalendarDate, DbId};
use biodata_core::update_plan::build_update;
use sqlx::postgres::{PgArguments, PgConnection};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::error::ProfileStoreError;
use crate::models::profile::{
    CreatedProfile, Profile, ProfileFilter, ProfilePage, ProfileStats, RegistrationMeta,
    UpdateOutcome,
};
use crate::repositories::ProfileImageRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, registration_code, \
    full_name, first_name, middle_name, last_name, gender, date_of_birth, birth_time, birth_place, \
    height, weight, complexion, blood_group, \
    marital_status, religion, caste, sub_caste, gotra, rashi, nakshatra, manglik, mother_tongue, \
    nationality, \
    education, occupation, employer, annual_income, \
    father_name, father_occupation, mother_name, mother_occupation, brothers, sisters, family_type, \
    phone, alternate_phone, email, address, city, state, country, pincode, \
    about_me, hobbies, partner_expectations, \
    photo_path, \
    registration_channel, status, approval_status, payment_status, expiry_date, created_by, \
    created_at, updated_at";

/// Days ahead counted as "expiring soon" in statistics.
const EXPIRING_SOON_DAYS: u32 = 7;

/// Bind plan parameters in placeholder order.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Text(value) => query.bind(value.clone()),
            SqlParam::Date(value) => query.bind(*value),
            SqlParam::BigInt(value) => query.bind(*value),
        };
    }
    query
}

fn log_anomalies(profile_id: Option<DbId>, anomalies: &[SoftAnomaly]) {
    for anomaly in anomalies {
        tracing::warn!(
            profile_id,
            field = anomaly.field,
            kind = ?anomaly.kind,
            raw = %anomaly.raw,
            "Malformed value stored as NULL"
        );
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Append the `WHERE` clause for a listing. Tombstones are excluded unless
/// the caller filters for them explicitly.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProfileFilter) {
    builder.push(" WHERE ");
    match non_empty(&filter.approval_status) {
        Some(approval) => {
            builder.push("approval_status = ").push_bind(approval);
        }
        None => {
            builder.push("approval_status <> ").push_bind(APPROVAL_DELETED);
        }
    }
    if let Some(status) = non_empty(&filter.status) {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(payment) = non_empty(&filter.payment_status) {
        builder.push(" AND payment_status = ").push_bind(payment);
    }
    if let Some(gender) = non_empty(&filter.gender) {
        builder.push(" AND LOWER(gender) = ").push_bind(gender);
    }
    if let Some(search) = non_empty(&filter.search) {
        let pattern = format!("%{}%", escape_like(&search));
        builder
            .push(" AND (full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR registration_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR city ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Provides registration, partial updates, workflow transitions and the
/// expiry sweep for profiles.
pub struct ProfileRepo;

impl ProfileRepo {
    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a new profile together with its image attachments.
    ///
    /// Runs in one transaction: insert profile, insert images, commit. Any
    /// failure rolls the whole registration back. A registration code
    /// collision regenerates the code and retries, up to
    /// [`MAX_CODE_ATTEMPTS`] times.
    pub async fn create(
        pool: &PgPool,
        proposed: &ProposedFields,
        meta: &RegistrationMeta,
    ) -> Result<CreatedProfile, ProfileStoreError> {
        let today = today_utc();
        let ctx = RegistrationContext {
            registration_code: generate_registration_code(today),
            channel: &meta.channel,
            attachment_path: meta.attachments.first().map(String::as_str),
            attribution: meta.attribution.as_deref(),
            today,
        };
        let mut plan = build_insert(proposed, &ctx)?;

        if !plan.ignored_fields.is_empty() {
            tracing::debug!(ignored = ?plan.ignored_fields, "Ignoring non-whitelisted registration fields");
        }
        log_anomalies(None, &plan.anomalies);

        let mut tx = pool.begin().await?;
        match Self::insert_in_tx(&mut *tx, &mut plan, today, &meta.attachments).await {
            Ok(created) => {
                tx.commit()
                    .await
                    .map_err(|e| ProfileStoreError::storage(&plan.columns, e))?;
                tracing::info!(
                    profile_id = created.id,
                    registration_code = %created.registration_code,
                    channel = %meta.channel,
                    images = meta.attachments.len(),
                    "Profile registered"
                );
                Ok(created)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "Failed to roll back registration");
                }
                Err(e)
            }
        }
    }

    async fn insert_in_tx(
        conn: &mut PgConnection,
        plan: &mut InsertPlan,
        today: CalendarDate,
        attachments: &[String],
    ) -> Result<CreatedProfile, ProfileStoreError> {
        let mut attempts = 0;
        let id = loop {
            attempts += 1;
            let sql = plan.sql();
            let row = bind_params(sqlx::query(&sql), &plan.params)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    tracing::error!(fields = ?plan.columns, error = %e, "Profile insert rejected by storage");
                    ProfileStoreError::storage(&plan.columns, e)
                })?;

            if let Some(row) = row {
                break row.try_get::<DbId, _>("id")?;
            }

            tracing::warn!(
                registration_code = plan.registration_code(),
                attempts,
                "Registration code collision"
            );
            if attempts >= MAX_CODE_ATTEMPTS {
                return Err(CoreError::Conflict(
                    "Could not allocate a unique registration code".to_string(),
                )
                .into());
            }
            plan.set_registration_code(generate_registration_code(today));
        };

        ProfileImageRepo::insert_for_profile(&mut *conn, id, attachments)
            .await
            .map_err(|e| ProfileStoreError::storage(&["profile_images"], e))?;

        Ok(CreatedProfile {
            id,
            registration_code: plan.registration_code().to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Find a profile by id. Tombstoned profiles are included so staff can
    /// inspect and restore them.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Profile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM profiles WHERE id = $1");
        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a profile by registration code. Excludes tombstones.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Profile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM profiles \
             WHERE registration_code = $1 AND approval_status <> $2"
        );
        sqlx::query_as::<_, Profile>(&query)
            .bind(code.trim())
            .bind(APPROVAL_DELETED)
            .fetch_optional(pool)
            .await
    }

    /// Whether a profile row exists, tombstoned or not.
    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// List profiles matching `filter`, newest first.
    pub async fn list(pool: &PgPool, filter: &ProfileFilter) -> Result<ProfilePage, sqlx::Error> {
        let limit = clamp_limit(filter.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let offset = clamp_offset(filter.offset);

        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
        push_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(pool)
            .await?;

        let mut select_builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM profiles"));
        push_filters(&mut select_builder, filter);
        select_builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let items = select_builder
            .build_query_as::<Profile>()
            .fetch_all(pool)
            .await?;

        Ok(ProfilePage {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Aggregate counts over all non-tombstoned profiles.
    pub async fn stats(pool: &PgPool, today: CalendarDate) -> Result<ProfileStats, sqlx::Error> {
        sqlx::query_as::<_, ProfileStats>(
            "SELECT \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE status = 'active') AS active, \
                COUNT(*) FILTER (WHERE status = 'inactive') AS inactive, \
                COUNT(*) FILTER (WHERE approval_status = 'pending') AS pending, \
                COUNT(*) FILTER (WHERE approval_status = 'approved') AS approved, \
                COUNT(*) FILTER (WHERE approval_status = 'rejected') AS rejected, \
                COUNT(*) FILTER (WHERE payment_status = 'paid') AS paid, \
                COUNT(*) FILTER (WHERE payment_status = 'unpaid') AS unpaid, \
                COUNT(*) FILTER ( \
                    WHERE status = 'active' AND expiry_date >= $1 AND expiry_date <= $2 \
                ) AS expiring_soon \
             FROM profiles \
             WHERE approval_status <> $3",
        )
        .bind(today)
        .bind(renewed_expiry(today, EXPIRING_SOON_DAYS))
        .bind(APPROVAL_DELETED)
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Partial update
    // -----------------------------------------------------------------------

    /// Apply a partial update to profile `id`.
    ///
    /// Non-whitelisted fields are ignored. An empty or fully ignored payload
    /// still refreshes `updated_at`. An edit that sets `approval_status` to
    /// `approved` is held to the same payment gate as [`Self::approve`].
    /// Zero affected rows (the row vanished after the lookup) is logged and
    /// reported, not an error.
    pub async fn apply_partial_update(
        pool: &PgPool,
        id: DbId,
        proposed: &ProposedFields,
    ) -> Result<UpdateOutcome, ProfileStoreError> {
        let plan = build_update(id, proposed)?;

        let current_payment: String =
            sqlx::query_scalar("SELECT payment_status FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "Profile",
                    id,
                })?;
        plan.check_approval(&current_payment)?;

        if !plan.ignored_fields.is_empty() {
            tracing::debug!(profile_id = id, ignored = ?plan.ignored_fields, "Ignoring non-whitelisted fields");
        }
        log_anomalies(Some(id), &plan.anomalies);

        let result = bind_params(sqlx::query(&plan.sql), &plan.params)
            .execute(pool)
            .await
            .map_err(|e| {
                tracing::error!(profile_id = id, fields = ?plan.columns, error = %e, "Profile update rejected by storage");
                ProfileStoreError::storage(&plan.columns, e)
            })?;

        let affected_rows = result.rows_affected();
        if affected_rows == 0 {
            tracing::warn!(profile_id = id, "Profile update affected no rows");
        } else {
            tracing::debug!(profile_id = id, fields = ?plan.columns, "Profile updated");
        }

        Ok(UpdateOutcome {
            success: true,
            affected_rows,
            applied_fields: plan.columns,
            ignored_fields: plan.ignored_fields,
            anomalies: plan.anomalies,
        })
    }

    // -----------------------------------------------------------------------
    // Workflow transitions
    // -----------------------------------------------------------------------

    /// Approve a paid profile and renew its validity for `validity_days`.
    ///
    /// Approval also reactivates the profile. Fails with `NotFound` for a
    /// missing or tombstoned profile and `Conflict` while payment is
    /// outstanding.
    pub async fn approve(
        pool: &PgPool,
        id: DbId,
        validity_days: u32,
    ) -> Result<Profile, ProfileStoreError> {
        let profile = Self::find_by_id(pool, id)
            .await?
            .filter(|p| p.approval_status != APPROVAL_DELETED)
            .ok_or(CoreError::NotFound {
                entity: "Profile",
                id,
            })?;
        validate_can_approve(&profile.payment_status)?;

        let expiry = renewed_expiry(today_utc(), validity_days);
        let query = format!(
            "UPDATE profiles SET \
                approval_status = 'approved', \
                status = 'active', \
                expiry_date = $2, \
                updated_at = NOW() \
             WHERE id = $1 AND payment_status = 'paid' AND approval_status <> $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .bind(expiry)
            .bind(APPROVAL_DELETED)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                ProfileStoreError::storage(&["approval_status", "status", "expiry_date"], e)
            })?
            .ok_or_else(|| {
                CoreError::Conflict("Profile changed while being approved".to_string()).into()
            })
    }

    /// Reject a profile. Returns `None` for a missing or tombstoned profile.
    pub async fn reject(pool: &PgPool, id: DbId) -> Result<Option<Profile>, sqlx::Error> {
        let query = format!(
            "UPDATE profiles SET approval_status = 'rejected', updated_at = NOW() \
             WHERE id = $1 AND approval_status <> $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .bind(APPROVAL_DELETED)
            .fetch_optional(pool)
            .await
    }

    /// Record the payment status. The value must already be validated.
    pub async fn set_payment_status(
        pool: &PgPool,
        id: DbId,
        payment_status: &str,
    ) -> Result<Option<Profile>, sqlx::Error> {
        let query = format!(
            "UPDATE profiles SET payment_status = $2, updated_at = NOW() \
             WHERE id = $1 AND approval_status <> $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .bind(payment_status)
            .bind(APPROVAL_DELETED)
            .fetch_optional(pool)
            .await
    }

    /// Tombstone a profile. Returns `true` if a row was marked deleted; the
    /// row itself is never removed.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE profiles SET approval_status = $2, updated_at = NOW() \
             WHERE id = $1 AND approval_status <> $2",
        )
        .bind(id)
        .bind(APPROVAL_DELETED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Expiry sweep
    // -----------------------------------------------------------------------

    /// Lapse every profile whose expiry date is before `today`.
    ///
    /// Selects the expired ids, then flips them to `inactive` in one bulk
    /// statement keyed by those ids. The update re-checks the predicate, so a
    /// row edited in between is left alone and an already inactive row is
    /// never touched twice.
    pub async fn expire_overdue(
        pool: &PgPool,
        today: CalendarDate,
    ) -> Result<SweepReport, sqlx::Error> {
        let rows: Vec<(DbId, Option<CalendarDate>, Option<String>)> = sqlx::query_as(
            "SELECT id, expiry_date, status FROM profiles \
             WHERE expiry_date IS NOT NULL \
               AND expiry_date < $1 \
               AND status IS DISTINCT FROM 'inactive' \
             ORDER BY id",
        )
        .bind(today)
        .fetch_all(pool)
        .await?;

        let candidates: Vec<DbId> = rows
            .into_iter()
            .filter(|(_, expiry, status)| is_expired(*expiry, status.as_deref(), today))
            .map(|(id, _, _)| id)
            .collect();

        if candidates.is_empty() {
            return Ok(SweepReport::default());
        }

        let mut affected_ids: Vec<DbId> = sqlx::query_scalar(
            "UPDATE profiles SET status = 'inactive', updated_at = NOW() \
             WHERE id = ANY($1) \
               AND expiry_date < $2 \
               AND status IS DISTINCT FROM 'inactive' \
             RETURNING id",
        )
        .bind(&candidates)
        .bind(today)
        .fetch_all(pool)
        .await?;
        affected_ids.sort_unstable();

        Ok(SweepReport {
            updated_count: affected_ids.len() as u64,
            affected_ids,
        })
    }
}
