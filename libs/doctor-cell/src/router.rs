use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Every doctor route needs a signed-in caller
    let protected_routes = Router::new()
        // Directory
        .route("/specialties", get(handlers::list_specialties))
        .route("/specialty/{specialty}", get(handlers::doctors_by_specialty))
        .route(
            "/{doctor_id}",
            get(handlers::get_doctor)
                .put(handlers::update_doctor)
                .delete(handlers::delete_doctor),
        )

        // Scheduling
        .route("/{doctor_id}/availability/{date}", get(handlers::get_availability))
        .route(
            "/{doctor_id}/working-hours",
            get(handlers::get_working_hours).put(handlers::set_working_hours),
        )

        // Admin
        .route("/", post(handlers::create_doctor))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
