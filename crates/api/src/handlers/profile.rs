//! Handlers for the `/profiles` resource.
//!
//! Registration is public (an optional bearer token supplies attribution and
//! the registration channel). Everything else requires a staff role.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use biodata_core::error::CoreError;
use biodata_core::plan::{proposed_from_json, ProposedFields};
use biodata_core::profile_status::{
    validate_payment_status, CHANNEL_ADMIN, CHANNEL_AGENT, CHANNEL_SELF,
};
use biodata_core::roles::{ROLE_ADMIN, ROLE_AGENT};
use biodata_core::settings::{validity_days, KEY_PROFILE_VALIDITY_DAYS, KEY_REGISTRATION_OPEN};
use biodata_core::types::{today_utc, DbId};
use biodata_db::models::profile::{
    CreatedProfile, Profile, ProfileFilter, ProfilePage, ProfileStats, RegistrationMeta,
    UpdateOutcome,
};
use biodata_db::models::profile_image::ProfileImage;
use biodata_db::repositories::{ProfileImageRepo, ProfileRepo, SettingRepo};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Profile",
        id,
    })
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Registration form body.
///
/// The contact fields are checked here; every other field passes through
/// to the whitelist in `biodata_core`, which drops anything unknown.
#[derive(Debug, Deserialize, Validate)]
pub struct RegistrationForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required(message = "gender is required"))]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(min = 7, max = 20, message = "phone must be 7 to 20 characters"))]
    pub phone: Option<String>,

    /// Paths returned by the upload service; the first is the primary photo.
    #[serde(default)]
    #[validate(length(max = 10, message = "at most 10 images may be attached"))]
    pub attachments: Vec<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RegistrationForm {
    fn into_parts(self) -> (ProposedFields, Vec<String>) {
        let mut fields = self.fields;
        for (name, value) in [
            ("gender", self.gender),
            ("email", self.email),
            ("phone", self.phone),
        ] {
            if let Some(value) = value {
                fields.insert(name.to_string(), Value::String(value));
            }
        }
        let attachments = self
            .attachments
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        (proposed_from_json(fields), attachments)
    }
}

/// Collapse validator output into one message naming the offending fields.
fn summarize(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|k| k.to_string())
        .collect();
    fields.sort();
    format!(
        "Registration could not be accepted. Please check: {}",
        fields.join(", ")
    )
}

fn channel_for(user: Option<&AuthUser>) -> &'static str {
    match user.map(|u| u.role.as_str()) {
        Some(ROLE_ADMIN) => CHANNEL_ADMIN,
        Some(ROLE_AGENT) => CHANNEL_AGENT,
        _ => CHANNEL_SELF,
    }
}

/// POST /api/v1/profiles
///
/// Self-service registrations are refused while the `registration_open`
/// setting is `false`; staff may always register on someone's behalf.
/// Only staff may preset approval, payment or expiry on a new profile.
pub async fn register(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(form): Json<RegistrationForm>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedProfile>>)> {
    form.validate()
        .map_err(|e| AppError::Core(CoreError::Validation(summarize(&e))))?;

    let channel = channel_for(user.as_ref());
    if channel == CHANNEL_SELF {
        let open = SettingRepo::get(&state.pool, KEY_REGISTRATION_OPEN).await?;
        if open.as_deref().map(str::trim) == Some("false") {
            return Err(AppError::Core(CoreError::Forbidden(
                "Registration is currently closed".into(),
            )));
        }
    }

    let (proposed, attachments) = form.into_parts();
    let meta = RegistrationMeta {
        channel: channel.to_string(),
        attachments,
        attribution: user.as_ref().and_then(AuthUser::attribution),
    };

    let created = ProfileRepo::create(&state.pool, &proposed, &meta).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/profiles
pub async fn list(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<ProfileFilter>,
) -> AppResult<Json<DataResponse<ProfilePage>>> {
    let page = ProfileRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/profiles/stats
pub async fn stats(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ProfileStats>>> {
    let stats = ProfileRepo::stats(&state.pool, today_utc()).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/profiles/{id}
///
/// Returns tombstoned profiles too, so staff can inspect them.
pub async fn get_by_id(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let profile = ProfileRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: profile }))
}

/// GET /api/v1/profiles/by-code/{code}
pub async fn get_by_code(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let profile = ProfileRepo::find_by_code(&state.pool, &code)
        .await?
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
    Ok(Json(DataResponse { data: profile }))
}

/// GET /api/v1/profiles/{id}/images
pub async fn list_images(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ProfileImage>>>> {
    if !ProfileRepo::exists(&state.pool, id).await? {
        return Err(not_found(id));
    }
    let images = ProfileImageRepo::list_by_profile(&state.pool, id).await?;
    Ok(Json(DataResponse { data: images }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// PATCH /api/v1/profiles/{id}
///
/// Accepts any JSON object; fields outside the whitelist are ignored and
/// reported back in `ignored_fields`.
pub async fn update(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<Map<String, Value>>,
) -> AppResult<Json<DataResponse<UpdateOutcome>>> {
    let proposed = proposed_from_json(body);
    let outcome = ProfileRepo::apply_partial_update(&state.pool, id, &proposed).await?;
    tracing::info!(
        profile_id = id,
        user_id = user.user_id,
        fields = ?outcome.applied_fields,
        "Profile edited"
    );
    Ok(Json(DataResponse { data: outcome }))
}

/// DELETE /api/v1/profiles/{id}
pub async fn delete(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ProfileRepo::soft_delete(&state.pool, id).await? {
        tracing::info!(profile_id = id, user_id = user.user_id, "Profile soft-deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// POST /api/v1/profiles/{id}/approve
///
/// Validity is renewed for the `profile_validity_days` setting.
pub async fn approve(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let stored = SettingRepo::get(&state.pool, KEY_PROFILE_VALIDITY_DAYS).await?;
    let days = validity_days(stored.as_deref());

    let profile = ProfileRepo::approve(&state.pool, id, days).await?;
    tracing::info!(
        profile_id = id,
        user_id = user.user_id,
        expiry_date = ?profile.expiry_date,
        "Profile approved"
    );
    Ok(Json(DataResponse { data: profile }))
}

/// POST /api/v1/profiles/{id}/reject
pub async fn reject(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let profile = ProfileRepo::reject(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(profile_id = id, user_id = user.user_id, "Profile rejected");
    Ok(Json(DataResponse { data: profile }))
}

/// Request body for `PUT /profiles/{id}/payment`.
#[derive(Debug, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: String,
}

/// PUT /api/v1/profiles/{id}/payment
pub async fn set_payment(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PaymentUpdate>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let payment_status = input.payment_status.trim().to_lowercase();
    validate_payment_status(&payment_status)?;

    let profile = ProfileRepo::set_payment_status(&state.pool, id, &payment_status)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(
        profile_id = id,
        user_id = user.user_id,
        payment_status = %payment_status,
        "Payment status recorded"
    );
    Ok(Json(DataResponse { data: profile }))
}
