use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let admin = Router::new()
        .route("/schema/{collection}", get(handlers::admin::get_schema))
        .route("/schema:invalidate", post(handlers::admin::invalidate_schema));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .route("/matches:rank", post(handlers::matches::rank_matches))
        .route(
            "/matches:invalidate",
            post(handlers::matches::invalidate_matches),
        )
        .route("/metrics/{name}", get(handlers::metrics::get_metric))
        .nest("/admin", admin)
}
