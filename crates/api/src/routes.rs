use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::middleware::require_user;
use crate::webhook::clerk_webhook;
use crate::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        // Current user
        .route("/users/me", get(get_me).patch(update_me).delete(delete_me))
        .route("/users/me/details", get(get_my_details))
        // Exercise catalog
        .route("/exercises", get(list_exercises).post(create_exercise))
        .route(
            "/exercises/:id",
            get(get_exercise).put(update_exercise).delete(delete_exercise),
        )
        // Workouts
        .route("/workouts", get(list_workouts).post(create_workout))
        .route(
            "/workouts/:id",
            get(get_workout).put(update_workout).delete(delete_workout),
        )
        // Analytics
        .route("/analytics/exercises/:id/personal-best", get(personal_best))
        .route("/analytics/exercises/:id/progress", get(exercise_progress))
        .route("/analytics/exercises/:id/one-rep-max", get(one_rep_max))
        .route("/analytics/exercises/:id/plateau", get(plateau))
        .route("/analytics/consistency", get(consistency))
        .route("/analytics/volume/weekly", get(weekly_volume))
        .route_layer(middleware::from_fn_with_state(state, require_user));

    Router::new()
        .route("/", get(root))
        // Health and metrics
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
        // Identity provider
        .route("/webhooks/clerk", post(clerk_webhook))
        .merge(authenticated)
}

pub fn build_router(state: AppState) -> Router {
    create_router(state.clone()).with_state(state)
}
