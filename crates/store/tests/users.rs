mod common;

use common::*;
use kilog_models::{CreateUserRequest, KilogError, UpdateUserRequest};

#[tokio::test]
async fn create_and_fetch_user() {
    let store = store().await;
    let created = user(&store, "ana").await;

    let by_id = store.get_user(created.id).await.unwrap();
    assert_eq!(by_id.email, "ana@example.com");
    assert!(by_id.last_login_at.is_some());
    assert!(by_id.updated_at.is_none());

    let by_auth = store.get_user_by_auth_id("user_ana").await.unwrap();
    assert_eq!(by_auth.map(|u| u.id), Some(created.id));
    assert!(store.get_user_by_auth_id("user_nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_identifiers_conflict() {
    let store = store().await;
    user(&store, "ana").await;

    let err = store
        .create_user(CreateUserRequest {
            email: "other@example.com".into(),
            auth_id: "user_ana".into(),
            username: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 409);
    assert_eq!(
        err.to_string(),
        "User with identifier 'Auth ID user_ana' already exists."
    );

    let err = store
        .create_user(CreateUserRequest {
            email: "ana@example.com".into(),
            auth_id: "user_other".into(),
            username: None,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Email ana@example.com"));
}

#[tokio::test]
async fn username_update_and_conflict() {
    let store = store().await;
    let ana = user(&store, "ana").await;
    user(&store, "ben").await;

    let updated = store
        .update_user(
            ana.id,
            UpdateUserRequest {
                username: Some("ana_lifts".into()),
                last_login_at: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.username.as_deref(), Some("ana_lifts"));
    assert!(updated.updated_at.is_some());

    let err = store
        .update_user(
            ana.id,
            UpdateUserRequest {
                username: Some("ben".into()),
                last_login_at: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KilogError::UserAlreadyExists { .. }));

    let unchanged = store
        .update_user(ana.id, UpdateUserRequest::default())
        .await
        .unwrap();
    assert_eq!(unchanged.username.as_deref(), Some("ana_lifts"));

    let err = store
        .update_user(
            ana.id,
            UpdateUserRequest {
                username: Some(" ".into()),
                last_login_at: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KilogError::InvalidRequest { .. }));
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let store = store().await;
    let err = store.get_user(99).await.unwrap_err();
    assert_eq!(err.to_string(), "User with id 99 not found.");
    assert!(store.delete_user(99).await.unwrap_err().is_not_found());
    assert!(store
        .update_user(99, UpdateUserRequest::default())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn deleting_user_cascades() {
    let store = store().await;
    let ana = user(&store, "ana").await;
    let custom = store
        .create_custom_exercise(
            kilog_models::CreateExerciseRequest {
                name: "Zercher Squat".into(),
                category: Some("Legs".into()),
            },
            ana.id,
        )
        .await
        .unwrap();
    let squat = system_exercise_id(&store, "Squat").await;
    store
        .create_workout(
            kilog_models::CreateWorkoutRequest {
                date: Some(days_ago(1)),
                notes: None,
                exercises: vec![
                    kilog_models::WorkoutExerciseInput {
                        exercise_id: squat,
                        sets: vec![set(100.0, 5)],
                    },
                    kilog_models::WorkoutExerciseInput {
                        exercise_id: custom.id,
                        sets: vec![set(60.0, 8)],
                    },
                ],
            },
            ana.id,
        )
        .await
        .unwrap();

    store.delete_user(ana.id).await.unwrap();

    let leftover_sets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sets")
        .fetch_one(store.pool())
        .await
        .unwrap();
    let leftover_custom: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE user_id IS NOT NULL")
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(leftover_sets, 0);
    assert_eq!(leftover_custom, 0);
    // System catalog survives.
    assert!(system_exercise_id(&store, "Squat").await > 0);
}

#[tokio::test]
async fn details_include_workouts_newest_first() {
    let store = store().await;
    let ana = user(&store, "ana").await;
    let bench = system_exercise_id(&store, "Bench Press").await;
    store
        .create_workout(workout_on(days_ago(3), bench, vec![set(80.0, 5)]), ana.id)
        .await
        .unwrap();
    store
        .create_workout(workout_on(days_ago(1), bench, vec![set(82.5, 5)]), ana.id)
        .await
        .unwrap();

    let details = store.get_user_details(ana.id).await.unwrap();
    assert_eq!(details.user.id, ana.id);
    assert_eq!(details.workouts.len(), 2);
    assert_eq!(details.workouts[0].date, days_ago(1));
    assert_eq!(details.workouts[0].exercises[0].sets[0].weight, 82.5);
}

#[tokio::test]
async fn touch_last_login_moves_forward() {
    let store = store().await;
    let ana = user(&store, "ana").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let touched = store.touch_last_login(ana.id).await.unwrap();
    assert!(touched.last_login_at > ana.last_login_at);
}
