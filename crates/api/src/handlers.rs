use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use kilog_metrics::TracingService;
use kilog_models::{
    CategoryVolume, Consistency, CreateExerciseRequest, CreateWorkoutRequest, ErrorShape, Exercise,
    KilogError, ListExercisesQuery, ListWorkoutsQuery, OneRepMaxEstimate, OneRepMaxFormula,
    OneRepMaxQuery, PersonalBest, PlateauQuery, PlateauStatus, ProgressPoint, ProgressQuery,
    UpdateExerciseRequest, UpdateProfileRequest, UpdateWorkoutRequest, UserDetailsResponse,
    UserResponse, WorkoutResponse, WorkoutSummary,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentUser;
use crate::AppState;

pub type ApiError = (StatusCode, Json<ErrorShape>);

/// Convert a domain error into the JSON error response and count it.
pub fn into_api_error(state: &AppState, e: KilogError) -> ApiError {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    state.metrics.record_api_error(status.as_u16());
    (status, Json(e.to_error_shape()))
}

// ---------------- Service ----------------

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("Welcome to {}.", state.config.app.project_name)
    }))
}

#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state
        .store
        .ping()
        .await
        .map_err(|e| into_api_error(&state, e))?;
    Ok("OK")
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.metrics.render().map_err(|e| into_api_error(&state, e))?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body).into_response())
}

// ---------------- Current user ----------------

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserResponse>, ApiError> {
    match state.store.get_user(user.id).await {
        Ok(found) => Ok(Json(UserResponse::from(found))),
        Err(e) => Err(into_api_error(&state, e)),
    }
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_my_details(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserDetailsResponse>, ApiError> {
    match state.store.get_user_details(user.id).await {
        Ok(details) => Ok(Json(details)),
        Err(e) => Err(into_api_error(&state, e)),
    }
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    info!("Updating profile for user {}", user.id);
    match state.store.update_user(user.id, payload.into()).await {
        Ok(updated) => Ok(Json(UserResponse::from(updated))),
        Err(e) => Err(into_api_error(&state, e)),
    }
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    info!("Deleting account of user {}", user.id);
    match state.store.delete_user(user.id).await {
        Ok(()) => {
            TracingService::log_user_deleted(&user.auth_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(into_api_error(&state, e)),
    }
}

// ---------------- Exercises ----------------

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_exercises(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<ListExercisesQuery>,
) -> Result<Json<Vec<Exercise>>, ApiError> {
    state
        .store
        .list_exercises(user.id, params.search.as_deref(), params.limit)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn create_exercise(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateExerciseRequest>,
) -> Result<(StatusCode, Json<Exercise>), ApiError> {
    info!("Creating custom exercise: {}", payload.name);
    match state.store.create_custom_exercise(payload, user.id).await {
        Ok(exercise) => Ok((StatusCode::CREATED, Json(exercise))),
        Err(e) => Err(into_api_error(&state, e)),
    }
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_exercise(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(exercise_id): ApiPath<i64>,
) -> Result<Json<Exercise>, ApiError> {
    state
        .store
        .get_exercise(exercise_id, user.id)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn update_exercise(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(exercise_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateExerciseRequest>,
) -> Result<Json<Exercise>, ApiError> {
    info!("Updating exercise {}", exercise_id);
    state
        .store
        .update_exercise(exercise_id, payload, user.id)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_exercise(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(exercise_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    info!("Deleting exercise {}", exercise_id);
    match state.store.delete_exercise(exercise_id, user.id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(into_api_error(&state, e)),
    }
}

// ---------------- Workouts ----------------

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_workouts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<ListWorkoutsQuery>,
) -> Result<Json<Vec<WorkoutSummary>>, ApiError> {
    state
        .store
        .list_user_workouts(user.id, params.limit, params.offset)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_workout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateWorkoutRequest>,
) -> Result<(StatusCode, Json<WorkoutResponse>), ApiError> {
    match state.store.create_workout(payload, user.id).await {
        Ok(workout) => {
            state.metrics.record_workout_created();
            TracingService::log_workout_created(&workout);
            Ok((StatusCode::CREATED, Json(workout)))
        }
        Err(e) => Err(into_api_error(&state, e)),
    }
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_workout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(workout_id): ApiPath<i64>,
) -> Result<Json<WorkoutResponse>, ApiError> {
    state
        .store
        .get_workout(workout_id, user.id)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_workout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(workout_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateWorkoutRequest>,
) -> Result<Json<WorkoutResponse>, ApiError> {
    info!("Replacing workout {}", workout_id);
    state
        .store
        .update_workout(workout_id, payload, user.id)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_workout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(workout_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    info!("Deleting workout {}", workout_id);
    match state.store.delete_workout(workout_id, user.id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(into_api_error(&state, e)),
    }
}

// ---------------- Analytics ----------------

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn personal_best(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(exercise_id): ApiPath<i64>,
) -> Result<Json<PersonalBest>, ApiError> {
    state
        .store
        .get_personal_best(user.id, exercise_id)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn exercise_progress(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(exercise_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<ProgressQuery>,
) -> Result<Json<Vec<ProgressPoint>>, ApiError> {
    state
        .store
        .get_exercise_progress(user.id, exercise_id, params.limit)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn one_rep_max(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(exercise_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<OneRepMaxQuery>,
) -> Result<Json<OneRepMaxEstimate>, ApiError> {
    let formula = match params.formula.as_deref() {
        None => OneRepMaxFormula::default(),
        Some(raw) => raw
            .parse::<OneRepMaxFormula>()
            .map_err(|reason| into_api_error(&state, KilogError::InvalidRequest { reason }))?,
    };
    state
        .store
        .get_one_rep_max(user.id, exercise_id, formula)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn plateau(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(exercise_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<PlateauQuery>,
) -> Result<Json<PlateauStatus>, ApiError> {
    state
        .store
        .get_plateau_status(user.id, exercise_id, params.window, params.tolerance)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn consistency(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Consistency>, ApiError> {
    state
        .store
        .get_weekly_consistency(user.id)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn weekly_volume(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<CategoryVolume>>, ApiError> {
    state
        .store
        .get_weekly_volume(user.id)
        .await
        .map(Json)
        .map_err(|e| into_api_error(&state, e))
}
