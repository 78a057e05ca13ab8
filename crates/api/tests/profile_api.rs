//! HTTP-level integration tests for the `/profiles` endpoints.

mod common;

use std::collections::BTreeMap;

use axum::http::StatusCode;
use biodata_core::settings::KEY_REGISTRATION_OPEN;
use biodata_db::repositories::SettingRepo;
use common::{
    admin_token, agent_token, body_json, delete, get, patch_json, post_json, put_json, token,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn register(pool: &PgPool, bearer: Option<&str>, body: serde_json::Value) -> i64 {
    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/profiles", bearer, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn fetch(pool: &PgPool, id: i64) -> serde_json::Value {
    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/profiles/{id}"), Some(&admin_token())).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_anonymous_registration_uses_sentinel(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/profiles",
        None,
        json!({"full_name": "Pooja Nair", "gender": "Female", "email": "pooja@example.com"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let id = json["data"]["id"].as_i64().unwrap();
    let code = json["data"]["registration_code"].as_str().unwrap().to_string();
    assert!(code.starts_with("BD-"));

    let profile = fetch(&pool, id).await;
    assert_eq!(profile["created_by"], "system");
    assert_eq!(profile["registration_channel"], "self");
    assert_eq!(profile["status"], "active");
    assert_eq!(profile["approval_status"], "pending");
    assert_eq!(profile["payment_status"], "unpaid");
    assert_eq!(profile["registration_code"], code.as_str());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_agent_registration_records_agent(pool: PgPool) {
    let id = register(
        &pool,
        Some(&agent_token()),
        json!({
            "first_name": "Arjun",
            "last_name": "Menon",
            "gender": "Male",
            "attachments": ["uploads/arjun-1.jpg", "uploads/arjun-2.jpg"],
        }),
    )
    .await;

    let profile = fetch(&pool, id).await;
    assert_eq!(profile["created_by"], "Meera Agent");
    assert_eq!(profile["registration_channel"], "agent");
    assert_eq!(profile["full_name"], "Arjun Menon");
    assert_eq!(profile["photo_path"], "uploads/arjun-1.jpg");

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/profiles/{id}/images"), Some(&agent_token())).await;
    let images = body_json(response).await;
    assert_eq!(images["data"].as_array().unwrap().len(), 2);
    assert_eq!(images["data"][0]["is_primary"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_registration_validation_is_summarized(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/profiles",
        None,
        json!({"full_name": "No Gender", "email": "not-an-email"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("email"));
    assert!(message.contains("gender"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_blank_optional_contact_fields_are_accepted(pool: PgPool) {
    let id = register(
        &pool,
        None,
        json!({"full_name": "Blank Email", "gender": "Female", "email": "  ", "phone": ""}),
    )
    .await;

    let profile = fetch(&pool, id).await;
    assert!(profile["email"].is_null());
    assert!(profile["phone"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_self_service_cannot_preset_workflow_fields(pool: PgPool) {
    let id = register(
        &pool,
        None,
        json!({
            "full_name": "Mallory",
            "gender": "F",
            "status": "inactive",
            "approval_status": "approved",
            "payment_status": "paid",
            "expiry_date": "2099-12-31",
        }),
    )
    .await;

    let profile = fetch(&pool, id).await;
    assert_eq!(profile["registration_channel"], "self");
    assert_eq!(profile["status"], "active");
    assert_eq!(profile["approval_status"], "pending");
    assert_eq!(profile["payment_status"], "unpaid");
    assert_ne!(profile["expiry_date"], "2099-12-31");

    // Still gated: approval needs a recorded payment.
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/profiles/{id}/approve"),
        Some(&admin_token()),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_staff_may_preset_workflow_fields(pool: PgPool) {
    let id = register(
        &pool,
        Some(&admin_token()),
        json!({
            "full_name": "Walk-in Member",
            "gender": "Male",
            "payment_status": "paid",
            "expiry_date": "2027-06-30",
        }),
    )
    .await;

    let profile = fetch(&pool, id).await;
    assert_eq!(profile["registration_channel"], "admin");
    assert_eq!(profile["payment_status"], "paid");
    assert_eq!(profile["expiry_date"], "2027-06-30");
    assert_eq!(profile["approval_status"], "pending");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_blank_workflow_fields_take_defaults(pool: PgPool) {
    for bearer in [None, Some(agent_token())] {
        let id = register(
            &pool,
            bearer.as_deref(),
            json!({
                "full_name": "Blank Workflow",
                "gender": "Female",
                "approval_status": "",
                "payment_status": "  ",
                "status": "paused",
            }),
        )
        .await;

        let profile = fetch(&pool, id).await;
        assert_eq!(profile["approval_status"], "pending");
        assert_eq!(profile["payment_status"], "unpaid");
        assert_eq!(profile["status"], "active");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_closed_registration_refuses_self_service(pool: PgPool) {
    let mut batch = BTreeMap::new();
    batch.insert(KEY_REGISTRATION_OPEN.to_string(), "false".to_string());
    SettingRepo::bulk_upsert(&pool, &batch).await.unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/profiles",
        None,
        json!({"full_name": "Late", "gender": "Male"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Staff can still register on someone's behalf.
    register(
        &pool,
        Some(&admin_token()),
        json!({"full_name": "Walk In", "gender": "Male"}),
    )
    .await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_token_is_not_treated_as_anonymous(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/profiles",
        Some("garbage"),
        json!({"full_name": "X", "gender": "Male"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_listing_requires_staff(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/profiles", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/profiles", Some(&token("member", "Someone"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/profiles", Some(&agent_token())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Partial update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_patch_applies_whitelisted_fields(pool: PgPool) {
    let id = register(&pool, None, json!({"full_name": "Edit Me", "gender": "Female"})).await;

    let app = common::build_test_app(pool.clone());
    let response = patch_json(
        app,
        &format!("/api/v1/profiles/{id}"),
        Some(&agent_token()),
        json!({
            "status": "INACTIVE ",
            "expiry_date": "2031-01-02 09:30:00",
            "created_by": "someone else",
            "favourite_colour": "blue",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = body_json(response).await;
    assert_eq!(outcome["data"]["success"], true);
    assert_eq!(outcome["data"]["affected_rows"], 1);
    assert_eq!(outcome["data"]["applied_fields"], json!(["expiry_date", "status"]));
    assert_eq!(
        outcome["data"]["ignored_fields"],
        json!(["created_by", "favourite_colour"])
    );

    let profile = fetch(&pool, id).await;
    assert_eq!(profile["status"], "inactive");
    assert_eq!(profile["expiry_date"], "2031-01-02");
    assert_eq!(profile["created_by"], "system");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_patch_missing_profile_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = patch_json(
        app,
        "/api/v1/profiles/999999",
        Some(&admin_token()),
        json!({"city": "Kochi"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_patch_bad_approval_status_returns_400(pool: PgPool) {
    let id = register(&pool, None, json!({"full_name": "Bad", "gender": "Male"})).await;

    let app = common::build_test_app(pool);
    let response = patch_json(
        app,
        &format!("/api/v1/profiles/{id}"),
        Some(&admin_token()),
        json!({"approval_status": "sort of"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_patch_cannot_approve_unpaid_profile(pool: PgPool) {
    let id = register(&pool, None, json!({"full_name": "Shortcut", "gender": "Male"})).await;

    let app = common::build_test_app(pool.clone());
    let response = patch_json(
        app,
        &format!("/api/v1/profiles/{id}"),
        Some(&agent_token()),
        json!({"approval_status": "approved"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let profile = fetch(&pool, id).await;
    assert_eq!(profile["approval_status"], "pending");
}

// ---------------------------------------------------------------------------
// Soft delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_tombstones_profile(pool: PgPool) {
    let id = register(&pool, None, json!({"full_name": "Gone", "gender": "Male"})).await;

    let app = common::build_test_app(pool.clone());
    let response = delete(app, &format!("/api/v1/profiles/{id}"), Some(&admin_token())).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool.clone());
    let response = delete(app, &format!("/api/v1/profiles/{id}"), Some(&admin_token())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still readable by id.
    let profile = fetch(&pool, id).await;
    assert_eq!(profile["approval_status"], "deleted");

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/profiles", Some(&admin_token())).await;
    let page = body_json(response).await;
    assert_eq!(page["data"]["total"], 0);

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/profiles/stats", Some(&admin_token())).await;
    let stats = body_json(response).await;
    assert_eq!(stats["data"]["total"], 0);
}

// ---------------------------------------------------------------------------
// Approval workflow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approval_requires_payment(pool: PgPool) {
    let id = register(&pool, None, json!({"full_name": "Applicant", "gender": "Female"})).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/profiles/{id}/approve"),
        Some(&agent_token()),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &format!("/api/v1/profiles/{id}/payment"),
        Some(&agent_token()),
        json!({"payment_status": " Paid "}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["payment_status"], "paid");

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/profiles/{id}/approve"),
        Some(&agent_token()),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["approval_status"], "approved");
    assert!(json["data"]["expiry_date"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_payment_status_returns_400(pool: PgPool) {
    let id = register(&pool, None, json!({"full_name": "Payer", "gender": "Male"})).await;

    let app = common::build_test_app(pool);
    let response = put_json(
        app,
        &format!("/api/v1/profiles/{id}/payment"),
        Some(&admin_token()),
        json!({"payment_status": "partially"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lookup_by_code(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/profiles",
        None,
        json!({"full_name": "Coded", "gender": "Female"}),
    )
    .await;
    let code = body_json(response).await["data"]["registration_code"]
        .as_str()
        .unwrap()
        .to_string();

    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/profiles/by-code/{code}"), Some(&admin_token())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["full_name"], "Coded");

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/profiles/by-code/BD-20000101-00000", Some(&admin_token())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
