use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::profile;
use crate::state::AppState;

/// Routes mounted at `/profiles`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(profile::register).get(profile::list))
        .route("/stats", get(profile::stats))
        .route("/by-code/{code}", get(profile::get_by_code))
        .route(
            "/{id}",
            get(profile::get_by_id)
                .patch(profile::update)
                .delete(profile::delete),
        )
        .route("/{id}/approve", post(profile::approve))
        .route("/{id}/reject", post(profile::reject))
        .route("/{id}/payment", put(profile::set_payment))
        .route("/{id}/images", get(profile::list_images))
}
