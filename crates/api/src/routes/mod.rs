pub mod admin;
pub mod health;
pub mod profile;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /profiles                                        register (public), list (staff)
/// /profiles/stats                                  aggregate counts (staff)
/// /profiles/by-code/{code}                         lookup by registration code (staff)
/// /profiles/{id}                                   get, partial update, soft delete (staff)
/// /profiles/{id}/approve                           approve and renew validity (POST)
/// /profiles/{id}/reject                            reject (POST)
/// /profiles/{id}/payment                           record payment status (PUT)
/// /profiles/{id}/images                            list image attachments (GET)
///
/// /admin/settings                                  read, bulk upsert (admin only)
/// /admin/expiry-sweep                              run a sweep now (POST, admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/profiles", profile::router())
        .nest("/admin", admin::router())
}
