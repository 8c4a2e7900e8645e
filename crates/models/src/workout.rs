use crate::{Exercise, KilogError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORKOUT_LIST_LIMIT: i64 = 20;
pub const MAX_RPE: f64 = 10.0;

/// A single gym session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Workout {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Link between a workout and a catalog exercise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct WorkoutExercise {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct WorkoutSet {
    pub id: i64,
    pub workout_exercise_id: i64,
    #[serde(rename = "order")]
    #[sqlx(rename = "set_order")]
    pub order: i64,
    pub weight: f64,
    pub reps: i64,
    pub rpe: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateSetRequest {
    pub weight: f64,
    pub reps: i64,
    #[serde(default)]
    pub rpe: Option<f64>,
    /// Position within the exercise; defaults to the set's index (1-based).
    #[serde(default)]
    pub order: Option<i64>,
}

impl CreateSetRequest {
    pub fn validate(&self) -> Result<(), KilogError> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(KilogError::InvalidMetric {
                detail: format!("weight must be a non-negative number, got {}", self.weight),
            });
        }
        if self.reps < 0 {
            return Err(KilogError::InvalidMetric {
                detail: format!("reps must not be negative, got {}", self.reps),
            });
        }
        if let Some(rpe) = self.rpe {
            if !rpe.is_finite() || !(0.0..=MAX_RPE).contains(&rpe) {
                return Err(KilogError::InvalidMetric {
                    detail: format!("rpe must be between 0 and {MAX_RPE}, got {rpe}"),
                });
            }
        }
        if let Some(order) = self.order {
            if order < 1 {
                return Err(KilogError::InvalidMetric {
                    detail: format!("order must be at least 1, got {order}"),
                });
            }
        }
        Ok(())
    }

    pub fn order_or(&self, index: usize) -> i64 {
        self.order.unwrap_or(index as i64 + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkoutExerciseInput {
    pub exercise_id: i64,
    #[serde(default)]
    pub sets: Vec<CreateSetRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateWorkoutRequest {
    /// Defaults to today (UTC) when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises: Vec<WorkoutExerciseInput>,
}

impl CreateWorkoutRequest {
    pub fn validate(&self) -> Result<(), KilogError> {
        validate_exercise_tree(&self.exercises)
    }
}

/// Full replacement of a workout's notes and exercise tree. The date is kept
/// when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UpdateWorkoutRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises: Vec<WorkoutExerciseInput>,
}

impl UpdateWorkoutRequest {
    pub fn validate(&self) -> Result<(), KilogError> {
        validate_exercise_tree(&self.exercises)
    }
}

pub fn validate_exercise_tree(exercises: &[WorkoutExerciseInput]) -> Result<(), KilogError> {
    if exercises.is_empty() {
        return Err(KilogError::EmptyWorkout);
    }
    exercises
        .iter()
        .flat_map(|ex| ex.sets.iter())
        .try_for_each(CreateSetRequest::validate)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExerciseResponse {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub exercise_catalog: Exercise,
    pub sets: Vec<WorkoutSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutResponse {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub exercises: Vec<WorkoutExerciseResponse>,
}

impl WorkoutResponse {
    pub fn from_parts(workout: Workout, exercises: Vec<WorkoutExerciseResponse>) -> Self {
        WorkoutResponse {
            id: workout.id,
            user_id: workout.user_id,
            date: workout.date,
            notes: workout.notes,
            created_at: workout.created_at,
            exercises,
        }
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|ex| ex.sets.len()).sum()
    }
}

/// Row shape for history lists, without the nested tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct WorkoutSummary {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub exercise_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListWorkoutsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
