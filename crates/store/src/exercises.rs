use crate::Store;
use kilog_models::{
    CreateExerciseRequest, Exercise, KilogError, UpdateExerciseRequest,
    DEFAULT_EXERCISE_LIST_LIMIT,
};
use sqlx::{Executor, Sqlite};
use tracing::{info, instrument, warn};

const MAX_EXERCISE_LIST_LIMIT: i64 = 500;

impl Store {
    /// System exercises plus the caller's own, ordered by name. `search` is a
    /// case-insensitive substring match.
    #[instrument(skip(self))]
    pub async fn list_exercises(
        &self,
        user_id: i64,
        search: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Exercise>, KilogError> {
        let limit = limit
            .unwrap_or(DEFAULT_EXERCISE_LIST_LIMIT)
            .clamp(1, MAX_EXERCISE_LIST_LIMIT);
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let exercises = sqlx::query_as::<_, Exercise>(
            "SELECT id, name, category, user_id FROM exercises \
             WHERE (user_id IS NULL OR user_id = ?) \
             AND (? IS NULL OR name LIKE ? ESCAPE '\\') \
             ORDER BY name COLLATE NOCASE, id LIMIT ?",
        )
        .bind(user_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(exercises)
    }

    /// A single exercise, as long as the caller can see it. Other users'
    /// custom exercises are reported as missing.
    #[instrument(skip(self))]
    pub async fn get_exercise(&self, exercise_id: i64, user_id: i64) -> Result<Exercise, KilogError> {
        match find_exercise(&self.pool, exercise_id).await? {
            Some(ex) if ex.is_visible_to(user_id) => Ok(ex),
            _ => Err(KilogError::ExerciseNotFound { exercise_id }),
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_custom_exercise(
        &self,
        request: CreateExerciseRequest,
        user_id: i64,
    ) -> Result<Exercise, KilogError> {
        request.validate()?;
        let exercise = sqlx::query_as::<_, Exercise>(
            "INSERT INTO exercises (name, category, user_id) VALUES (?, ?, ?) \
             RETURNING id, name, category, user_id",
        )
        .bind(request.name.trim())
        .bind(normalize_category(request.category))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        info!("User {} created exercise {} ({})", user_id, exercise.id, exercise.name);
        Ok(exercise)
    }

    #[instrument(skip(self, request))]
    pub async fn update_exercise(
        &self,
        exercise_id: i64,
        request: UpdateExerciseRequest,
        user_id: i64,
    ) -> Result<Exercise, KilogError> {
        request.validate()?;
        let current = self.writable_exercise(exercise_id, user_id).await?;

        let name = request
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(current.name);
        let category = match request.category {
            Some(category) => normalize_category(Some(category)),
            None => current.category,
        };

        let exercise = sqlx::query_as::<_, Exercise>(
            "UPDATE exercises SET name = ?, category = ? WHERE id = ? \
             RETURNING id, name, category, user_id",
        )
        .bind(&name)
        .bind(&category)
        .bind(exercise_id)
        .fetch_one(&self.pool)
        .await?;

        info!("User {} updated exercise {}", user_id, exercise_id);
        Ok(exercise)
    }

    /// Delete a custom exercise. Fails with a conflict while any workout
    /// still references it.
    #[instrument(skip(self))]
    pub async fn delete_exercise(&self, exercise_id: i64, user_id: i64) -> Result<(), KilogError> {
        self.writable_exercise(exercise_id, user_id).await?;

        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workout_exercises WHERE exercise_id = ?")
                .bind(exercise_id)
                .fetch_one(&self.pool)
                .await?;
        if in_use > 0 {
            warn!("Exercise {} is referenced by {} workout entries", exercise_id, in_use);
            return Err(KilogError::ResourceConflict {
                message: format!(
                    "Exercise with id {exercise_id} is used in {in_use} workout entries and cannot be deleted."
                ),
            });
        }

        sqlx::query("DELETE FROM exercises WHERE id = ?")
            .bind(exercise_id)
            .execute(&self.pool)
            .await?;
        info!("User {} deleted exercise {}", user_id, exercise_id);
        Ok(())
    }

    /// Load an exercise for modification: 404 when missing, 403 when it is a
    /// system exercise or belongs to someone else.
    async fn writable_exercise(&self, exercise_id: i64, user_id: i64) -> Result<Exercise, KilogError> {
        let exercise = find_exercise(&self.pool, exercise_id)
            .await?
            .ok_or(KilogError::ExerciseNotFound { exercise_id })?;
        exercise.check_writable_by(user_id)?;
        Ok(exercise)
    }
}

pub(crate) async fn find_exercise<'e, E>(
    executor: E,
    exercise_id: i64,
) -> Result<Option<Exercise>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Exercise>("SELECT id, name, category, user_id FROM exercises WHERE id = ?")
        .bind(exercise_id)
        .fetch_optional(executor)
        .await
}

fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
