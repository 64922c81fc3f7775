use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/gauge.svg", get(handlers::gauge_svg))
        .route("/api/gauge/frame", post(handlers::gauge_frame))
        .route("/api/gauge/viewport", post(handlers::gauge_viewport))
        .route("/api/gauge/gesture", post(handlers::gauge_gesture))
        .route("/api/today", get(handlers::get_today))
        .route("/api/intake", post(handlers::add_intake))
        .route("/api/undo", post(handlers::undo))
        .route("/api/undo-all", post(handlers::undo_all))
        .route("/api/parameters", get(handlers::get_parameters))
        .route("/api/goal", post(handlers::set_goal))
        .route("/api/profiles", post(handlers::add_profile))
        .route("/api/profiles/:id", delete(handlers::delete_profile))
        .route("/api/reminders", post(handlers::add_reminder))
        .route("/api/reminders/:id", delete(handlers::delete_reminder))
        .route("/api/reminders/evaluate", post(handlers::evaluate_reminders))
        .route("/api/stats", get(handlers::get_stats))
        .with_state(state)
}
