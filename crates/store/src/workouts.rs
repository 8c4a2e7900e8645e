use crate::exercises::find_exercise;
use crate::Store;
use chrono::Utc;
use kilog_models::{
    CreateWorkoutRequest, Exercise, KilogError, UpdateWorkoutRequest, Workout,
    WorkoutExerciseInput, WorkoutExerciseResponse, WorkoutResponse, WorkoutSet, WorkoutSummary,
    DEFAULT_WORKOUT_LIST_LIMIT,
};
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

const MAX_WORKOUT_LIST_LIMIT: i64 = 200;

/// A `workout_exercises` row joined with its catalog entry.
#[derive(sqlx::FromRow)]
struct ExerciseLinkRow {
    id: i64,
    workout_id: i64,
    exercise_id: i64,
    name: String,
    category: Option<String>,
    owner_id: Option<i64>,
}

impl Store {
    /// Create a workout with its exercises and sets in one transaction.
    #[instrument(skip(self, request), fields(exercises = request.exercises.len()))]
    pub async fn create_workout(
        &self,
        request: CreateWorkoutRequest,
        user_id: i64,
    ) -> Result<WorkoutResponse, KilogError> {
        request.validate()?;
        let date = request.date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.pool.begin().await?;
        let workout_id: i64 = sqlx::query_scalar(
            "INSERT INTO workouts (user_id, date, notes, created_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(user_id)
        .bind(date)
        .bind(&request.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        insert_exercise_tree(&mut *tx, workout_id, user_id, &request.exercises).await?;
        tx.commit().await?;

        info!("User {} created workout {} on {}", user_id, workout_id, date);
        self.get_workout(workout_id, user_id).await
    }

    /// Full workout tree. Someone else's workout is a permission error.
    #[instrument(skip(self))]
    pub async fn get_workout(&self, workout_id: i64, user_id: i64) -> Result<WorkoutResponse, KilogError> {
        let workout = self.owned_workout(workout_id, user_id).await?;
        self.load_workout_tree(workout).await
    }

    /// Summaries of the user's workouts, newest date first.
    #[instrument(skip(self))]
    pub async fn list_user_workouts(
        &self,
        user_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<WorkoutSummary>, KilogError> {
        let limit = limit
            .unwrap_or(DEFAULT_WORKOUT_LIST_LIMIT)
            .clamp(1, MAX_WORKOUT_LIST_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let summaries = sqlx::query_as::<_, WorkoutSummary>(
            "SELECT w.id, w.user_id, w.date, w.notes, w.created_at, \
                    COUNT(we.id) AS exercise_count \
             FROM workouts w \
             LEFT JOIN workout_exercises we ON we.workout_id = w.id \
             WHERE w.user_id = ? \
             GROUP BY w.id \
             ORDER BY w.date DESC, w.id DESC \
             LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    /// Replace notes and the exercise tree. The date is kept when omitted.
    #[instrument(skip(self, request))]
    pub async fn update_workout(
        &self,
        workout_id: i64,
        request: UpdateWorkoutRequest,
        user_id: i64,
    ) -> Result<WorkoutResponse, KilogError> {
        request.validate()?;
        let current = self.owned_workout(workout_id, user_id).await?;
        let date = request.date.unwrap_or(current.date);

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE workouts SET date = ?, notes = ? WHERE id = ?")
            .bind(date)
            .bind(&request.notes)
            .bind(workout_id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM workout_exercises WHERE workout_id = ?")
            .bind(workout_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        debug!("Cleared {} exercise entries from workout {}", removed, workout_id);

        insert_exercise_tree(&mut *tx, workout_id, user_id, &request.exercises).await?;
        tx.commit().await?;

        info!("User {} updated workout {}", user_id, workout_id);
        self.get_workout(workout_id, user_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_workout(&self, workout_id: i64, user_id: i64) -> Result<(), KilogError> {
        self.owned_workout(workout_id, user_id).await?;
        sqlx::query("DELETE FROM workouts WHERE id = ?")
            .bind(workout_id)
            .execute(&self.pool)
            .await?;
        info!("User {} deleted workout {}", user_id, workout_id);
        Ok(())
    }

    /// Every workout of the user as a full tree, newest first.
    pub(crate) async fn load_all_workouts(&self, user_id: i64) -> Result<Vec<WorkoutResponse>, KilogError> {
        let workouts = sqlx::query_as::<_, Workout>(
            "SELECT id, user_id, date, notes, created_at FROM workouts \
             WHERE user_id = ? ORDER BY date DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut trees = Vec::with_capacity(workouts.len());
        for workout in workouts {
            trees.push(self.load_workout_tree(workout).await?);
        }
        Ok(trees)
    }

    async fn owned_workout(&self, workout_id: i64, user_id: i64) -> Result<Workout, KilogError> {
        let workout = sqlx::query_as::<_, Workout>(
            "SELECT id, user_id, date, notes, created_at FROM workouts WHERE id = ?",
        )
        .bind(workout_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(KilogError::WorkoutNotFound { workout_id })?;

        if workout.user_id != user_id {
            warn!("User {} tried to access workout {} of user {}", user_id, workout_id, workout.user_id);
            return Err(KilogError::permission_denied(
                "Workout belongs to another user",
                user_id,
            ));
        }
        Ok(workout)
    }

    async fn load_workout_tree(&self, workout: Workout) -> Result<WorkoutResponse, KilogError> {
        let links = sqlx::query_as::<_, ExerciseLinkRow>(
            "SELECT we.id, we.workout_id, we.exercise_id, e.name, e.category, e.user_id AS owner_id \
             FROM workout_exercises we \
             JOIN exercises e ON e.id = we.exercise_id \
             WHERE we.workout_id = ? \
             ORDER BY we.id",
        )
        .bind(workout.id)
        .fetch_all(&self.pool)
        .await?;

        let sets = sqlx::query_as::<_, WorkoutSet>(
            "SELECT s.id, s.workout_exercise_id, s.set_order, s.weight, s.reps, s.rpe \
             FROM sets s \
             JOIN workout_exercises we ON we.id = s.workout_exercise_id \
             WHERE we.workout_id = ? \
             ORDER BY s.set_order, s.id",
        )
        .bind(workout.id)
        .fetch_all(&self.pool)
        .await?;

        let mut sets_by_link: HashMap<i64, Vec<WorkoutSet>> = HashMap::new();
        for set in sets {
            sets_by_link.entry(set.workout_exercise_id).or_default().push(set);
        }

        let exercises = links
            .into_iter()
            .map(|link| WorkoutExerciseResponse {
                id: link.id,
                workout_id: link.workout_id,
                exercise_id: link.exercise_id,
                exercise_catalog: Exercise {
                    id: link.exercise_id,
                    name: link.name,
                    category: link.category,
                    user_id: link.owner_id,
                },
                sets: sets_by_link.remove(&link.id).unwrap_or_default(),
            })
            .collect();

        Ok(WorkoutResponse::from_parts(workout, exercises))
    }
}

/// Insert exercise entries and their sets. Every exercise must be visible to
/// `user_id`; the caller's transaction is dropped (rolled back) on error.
async fn insert_exercise_tree(
    conn: &mut SqliteConnection,
    workout_id: i64,
    user_id: i64,
    exercises: &[WorkoutExerciseInput],
) -> Result<(), KilogError> {
    for entry in exercises {
        let visible = find_exercise(&mut *conn, entry.exercise_id)
            .await?
            .is_some_and(|ex| ex.is_visible_to(user_id));
        if !visible {
            warn!("Exercise {} is not available to user {}", entry.exercise_id, user_id);
            return Err(KilogError::ExerciseNotFound {
                exercise_id: entry.exercise_id,
            });
        }

        let link_id: i64 = sqlx::query_scalar(
            "INSERT INTO workout_exercises (workout_id, exercise_id) VALUES (?, ?) RETURNING id",
        )
        .bind(workout_id)
        .bind(entry.exercise_id)
        .fetch_one(&mut *conn)
        .await?;

        for (index, set) in entry.sets.iter().enumerate() {
            sqlx::query(
                "INSERT INTO sets (workout_exercise_id, set_order, weight, reps, rpe) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(link_id)
            .bind(set.order_or(index))
            .bind(set.weight)
            .bind(set.reps)
            .bind(set.rpe)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}
