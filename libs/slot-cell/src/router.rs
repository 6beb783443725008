use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn slot_routes(state: AppState) -> Router {
    Router::new()
        .route("/{doctor_id}/slots", get(handlers::list_slots).post(handlers::create_slots))
        .route(
            "/{doctor_id}/slots/{slot_id}",
            put(handlers::update_slot).delete(handlers::delete_slot),
        )
        .route("/{doctor_id}/slots/book", post(handlers::book_slot))
        .route("/{doctor_id}/slots/cancel", post(handlers::cancel_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
