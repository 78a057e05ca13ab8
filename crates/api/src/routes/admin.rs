use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{admin, settings};
use crate::state::AppState;

/// Routes mounted at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(settings::list).put(settings::bulk_update))
        .route("/expiry-sweep", post(admin::run_expiry_sweep))
}
