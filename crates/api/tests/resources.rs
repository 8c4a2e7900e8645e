mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn exercise_crud_over_http() {
    let (state, app) = app().await;
    let (user, token) = signed_in(&state, "ana").await;
    let (_, other_token) = signed_in(&state, "ben").await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/exercises",
        Some(&token),
        Some(json!({"name": "Cable Fly", "category": "Push"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], user.id);
    let id = created["id"].as_i64().unwrap();

    let (status, list) = send(&app, Method::GET, "/exercises?search=fly", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let uri = format!("/exercises/{id}");
    let (status, body) = send(&app, Method::GET, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("Exercise with id {id} not found."));

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({"category": "Chest"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Cable Fly");
    assert_eq!(updated["category"], "Chest");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn system_exercises_are_read_only() {
    let (state, app) = app().await;
    let (_, token) = signed_in(&state, "ana").await;
    let squat = system_exercise_id(&state, "Squat").await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/exercises/{squat}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn malformed_input_uses_json_errors() {
    let (state, app) = app().await;
    let (_, token) = signed_in(&state, "ana").await;

    let (status, body) = send(&app, Method::GET, "/exercises/not-a-number", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    let (status, body) = send(
        &app,
        Method::POST,
        "/exercises",
        Some(&token),
        Some(json!({"category": "Push"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("name"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/workouts",
        Some(&token),
        Some(json!({"exercises": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot save an empty workout. Add at least one exercise."
    );
}

#[tokio::test]
async fn workout_lifecycle_and_analytics() {
    let (state, app) = app().await;
    let (_, token) = signed_in(&state, "ana").await;
    let (_, other_token) = signed_in(&state, "ben").await;
    let bench = system_exercise_id(&state, "Bench Press").await;
    let today = chrono::Utc::now().date_naive();

    let (status, workout) = send(
        &app,
        Method::POST,
        "/workouts",
        Some(&token),
        Some(json!({
            "date": today.to_string(),
            "notes": "Push day",
            "exercises": [{
                "exercise_id": bench,
                "sets": [
                    {"weight": 100, "reps": 5, "rpe": 8},
                    {"weight": 90, "reps": 10}
                ]
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(workout["exercises"][0]["exercise_catalog"]["name"], "Bench Press");
    assert_eq!(workout["exercises"][0]["sets"][1]["order"], 2);
    let id = workout["id"].as_i64().unwrap();
    let uri = format!("/workouts/{id}");

    let (status, list) = send(&app, Method::GET, "/workouts?limit=5", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["exercise_count"], 1);

    let (status, _) = send(&app, Method::GET, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let analytics = format!("/analytics/exercises/{bench}");
    let (_, best) = send(&app, Method::GET, &format!("{analytics}/personal-best"), Some(&token), None).await;
    assert_eq!(best["weight"], 100.0);

    let (_, progress) = send(&app, Method::GET, &format!("{analytics}/progress"), Some(&token), None).await;
    assert_eq!(progress, json!([{"date": today.to_string(), "weight": 100.0}]));

    let (_, orm) = send(
        &app,
        Method::GET,
        &format!("{analytics}/one-rep-max?formula=brzycki"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(orm["formula"], "brzycki");
    assert_eq!(orm["reps"], 10);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("{analytics}/one-rep-max?formula=wathan"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, plateau) = send(&app, Method::GET, &format!("{analytics}/plateau"), Some(&token), None).await;
    assert_eq!(plateau["plateaued"], false);
    assert_eq!(plateau["sessions"], 1);

    let (_, consistency) = send(&app, Method::GET, "/analytics/consistency", Some(&token), None).await;
    assert_eq!(consistency, json!({"workouts_last_7_days": 1}));

    let (_, volume) = send(&app, Method::GET, "/analytics/volume/weekly", Some(&token), None).await;
    assert_eq!(volume, json!([{"category": "Push", "volume": 1400.0, "sets": 2}]));

    let (status, replaced) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({"notes": "edited", "exercises": [{"exercise_id": bench, "sets": []}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["notes"], "edited");
    assert_eq!(replaced["date"], today.to_string());

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn plateau_parameters_are_validated() {
    let (state, app) = app().await;
    let (_, token) = signed_in(&state, "ana").await;
    let bench = system_exercise_id(&state, "Bench Press").await;
    let plateau = format!("/analytics/exercises/{bench}/plateau");

    let (status, err) = send(&app, Method::GET, &format!("{plateau}?window=0"), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["message"], "Invalid request: window must be at least 1");

    let (status, err) = send(&app, Method::GET, &format!("{plateau}?tolerance=-2.5"), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        err["message"],
        "Invalid request: tolerance must be a non-negative number, got -2.5"
    );

    let (status, err) = send(&app, Method::GET, &format!("{plateau}?tolerance=NaN"), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["message"], "Invalid request: tolerance must be a non-negative number, got NaN");

    let (status, ok) = send(&app, Method::GET, &format!("{plateau}?window=2&tolerance=1.5"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ok["window"], 2);
}
