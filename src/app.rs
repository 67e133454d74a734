use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/tasks/:id/toggle", post(handlers::toggle_task_form))
        .route("/api/today", get(handlers::get_today))
        .route("/api/tasks/toggle", post(handlers::toggle_task))
        .route("/api/fasting", post(handlers::set_fasting))
        .route("/api/heatmap", get(handlers::get_heatmap))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/prayer-times", get(handlers::get_prayer_times))
        .route(
            "/api/bookmark",
            get(handlers::get_bookmark).put(handlers::put_bookmark),
        )
        .route(
            "/api/session",
            post(handlers::login).delete(handlers::logout),
        )
        .route("/api/reset", post(handlers::reset))
        .route("/api/events", get(handlers::events))
        .with_state(state)
}
