use axum::{routing::get, Router};

use notification_cell::notification_routes;
use reminder_cell::reminder_routes;
use shared_database::AppState;
use slot_cell::slot_routes;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/doctors", slot_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/reminders", reminder_routes(state))
}
