use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn reminder_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list_reminders))
        .route("/sweep", post(handlers::run_reminder_sweep))
        .route("/{appointment_id}", put(handlers::set_reminder))
        .route("/{appointment_id}/send", post(handlers::send_manual_reminder))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
