//! Read-side aggregates over a user's training history.

use crate::Store;
use chrono::{Duration, NaiveDate, Utc};
use kilog_models::{
    best_one_rep_max, detect_plateau, CategoryVolume, Consistency, KilogError, OneRepMaxEstimate,
    OneRepMaxFormula, PersonalBest, PlateauStatus, ProgressPoint, WorkoutSet,
    CONSISTENCY_WINDOW_DAYS, DEFAULT_PLATEAU_WINDOW, DEFAULT_PROGRESS_LIMIT, UNCATEGORIZED,
};
use tracing::{debug, instrument};

#[derive(sqlx::FromRow)]
struct VolumeRow {
    bucket: String,
    volume: Option<f64>,
    sets: i64,
}

impl Store {
    /// Heaviest weight the user has ever logged for the exercise.
    #[instrument(skip(self))]
    pub async fn get_personal_best(
        &self,
        user_id: i64,
        exercise_id: i64,
    ) -> Result<PersonalBest, KilogError> {
        self.get_exercise(exercise_id, user_id).await?;
        let weight: Option<f64> = sqlx::query_scalar(
            "SELECT MAX(s.weight) FROM sets s \
             JOIN workout_exercises we ON we.id = s.workout_exercise_id \
             JOIN workouts w ON w.id = we.workout_id \
             WHERE w.user_id = ? AND we.exercise_id = ?",
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(PersonalBest { exercise_id, weight })
    }

    /// Top weight per session for the most recent `limit` sessions, oldest
    /// first.
    #[instrument(skip(self))]
    pub async fn get_exercise_progress(
        &self,
        user_id: i64,
        exercise_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ProgressPoint>, KilogError> {
        self.get_exercise(exercise_id, user_id).await?;
        let limit = limit.unwrap_or(DEFAULT_PROGRESS_LIMIT).max(1);
        self.progress_points(user_id, exercise_id, limit).await
    }

    /// Workouts dated on or after today minus seven days.
    #[instrument(skip(self))]
    pub async fn get_weekly_consistency(&self, user_id: i64) -> Result<Consistency, KilogError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workouts WHERE user_id = ? AND date >= ?")
                .bind(user_id)
                .bind(window_start())
                .fetch_one(&self.pool)
                .await?;
        Ok(Consistency {
            workouts_last_7_days: count,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_one_rep_max(
        &self,
        user_id: i64,
        exercise_id: i64,
        formula: OneRepMaxFormula,
    ) -> Result<OneRepMaxEstimate, KilogError> {
        self.get_exercise(exercise_id, user_id).await?;
        let sets = sqlx::query_as::<_, WorkoutSet>(
            "SELECT s.id, s.workout_exercise_id, s.set_order, s.weight, s.reps, s.rpe \
             FROM sets s \
             JOIN workout_exercises we ON we.id = s.workout_exercise_id \
             JOIN workouts w ON w.id = we.workout_id \
             WHERE w.user_id = ? AND we.exercise_id = ?",
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_all(&self.pool)
        .await?;
        debug!("Estimating 1RM from {} sets", sets.len());

        let best = best_one_rep_max(&sets, formula);
        Ok(OneRepMaxEstimate {
            exercise_id,
            formula,
            estimate: best.map(|(estimate, _)| estimate),
            weight: best.map(|(_, set)| set.weight),
            reps: best.map(|(_, set)| set.reps),
        })
    }

    /// Volume load per category over the last seven days, largest first.
    #[instrument(skip(self))]
    pub async fn get_weekly_volume(&self, user_id: i64) -> Result<Vec<CategoryVolume>, KilogError> {
        let rows = sqlx::query_as::<_, VolumeRow>(
            "SELECT COALESCE(e.category, ?) AS bucket, \
                    SUM(s.weight * s.reps) AS volume, \
                    COUNT(s.id) AS sets \
             FROM sets s \
             JOIN workout_exercises we ON we.id = s.workout_exercise_id \
             JOIN workouts w ON w.id = we.workout_id \
             JOIN exercises e ON e.id = we.exercise_id \
             WHERE w.user_id = ? AND w.date >= ? \
             GROUP BY bucket \
             ORDER BY volume DESC, bucket",
        )
        .bind(UNCATEGORIZED)
        .bind(user_id)
        .bind(window_start())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryVolume {
                category: row.bucket,
                volume: row.volume.unwrap_or(0.0),
                sets: row.sets,
            })
            .collect())
    }

    /// Whether the recent sessions stalled against the earlier best. Looks at
    /// the whole history of the exercise.
    #[instrument(skip(self))]
    pub async fn get_plateau_status(
        &self,
        user_id: i64,
        exercise_id: i64,
        window: Option<usize>,
        tolerance: Option<f64>,
    ) -> Result<PlateauStatus, KilogError> {
        self.get_exercise(exercise_id, user_id).await?;
        let window = window.unwrap_or(DEFAULT_PLATEAU_WINDOW);
        if window == 0 {
            return Err(KilogError::InvalidRequest {
                reason: "window must be at least 1".to_string(),
            });
        }
        let tolerance = tolerance.unwrap_or(0.0);
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(KilogError::InvalidRequest {
                reason: format!("tolerance must be a non-negative number, got {tolerance}"),
            });
        }

        // SQLite treats a negative LIMIT as unbounded.
        let points = self.progress_points(user_id, exercise_id, -1).await?;
        Ok(PlateauStatus {
            exercise_id,
            window,
            sessions: points.len(),
            plateaued: detect_plateau(&points, window, tolerance),
        })
    }

    async fn progress_points(
        &self,
        user_id: i64,
        exercise_id: i64,
        limit: i64,
    ) -> Result<Vec<ProgressPoint>, KilogError> {
        let points = sqlx::query_as::<_, ProgressPoint>(
            "SELECT date, weight FROM ( \
                SELECT w.id AS workout_id, w.date AS date, MAX(s.weight) AS weight \
                FROM workouts w \
                JOIN workout_exercises we ON we.workout_id = w.id \
                JOIN sets s ON s.workout_exercise_id = we.id \
                WHERE w.user_id = ? AND we.exercise_id = ? \
                GROUP BY w.id, w.date \
                ORDER BY w.date DESC, w.id DESC \
                LIMIT ? \
             ) ORDER BY date ASC, workout_id ASC",
        )
        .bind(user_id)
        .bind(exercise_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(points)
    }
}

fn window_start() -> NaiveDate {
    Utc::now().date_naive() - Duration::days(CONSISTENCY_WINDOW_DAYS)
}
