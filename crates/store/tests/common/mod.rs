#![allow(dead_code)]

use kilog_models::{CreateSetRequest, CreateUserRequest, CreateWorkoutRequest, User, WorkoutExerciseInput};
use kilog_store::Store;

pub async fn store() -> Store {
    Store::in_memory().await.expect("in-memory store")
}

pub async fn user(store: &Store, handle: &str) -> User {
    store
        .create_user(CreateUserRequest {
            email: format!("{handle}@example.com"),
            auth_id: format!("user_{handle}"),
            username: Some(handle.to_string()),
        })
        .await
        .expect("create user")
}

pub async fn system_exercise_id(store: &Store, name: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM exercises WHERE name = ? AND user_id IS NULL")
        .bind(name)
        .fetch_one(store.pool())
        .await
        .expect("seeded exercise")
}

pub fn set(weight: f64, reps: i64) -> CreateSetRequest {
    CreateSetRequest {
        weight,
        reps,
        rpe: None,
        order: None,
    }
}

pub fn workout_on(date: chrono::NaiveDate, exercise_id: i64, sets: Vec<CreateSetRequest>) -> CreateWorkoutRequest {
    CreateWorkoutRequest {
        date: Some(date),
        notes: None,
        exercises: vec![WorkoutExerciseInput { exercise_id, sets }],
    }
}

pub fn days_ago(days: i64) -> chrono::NaiveDate {
    chrono::Utc::now().date_naive() - chrono::Duration::days(days)
}
