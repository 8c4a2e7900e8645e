use crate::Store;
use chrono::Utc;
use kilog_models::{
    CreateUserRequest, KilogError, UpdateUserRequest, User, UserDetailsResponse, UserResponse,
};
use tracing::{info, instrument, warn};

const USER_COLUMNS: &str = "id, email, auth_id, username, created_at, updated_at, last_login_at";

impl Store {
    #[instrument(skip(self, request), fields(auth_id = %request.auth_id))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, KilogError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO users (email, auth_id, username, created_at, last_login_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&request.email)
            .bind(&request.auth_id)
            .bind(&request.username)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| user_conflict(e, &request.email, &request.auth_id, request.username.as_deref()))?;

        info!("Created user {} ({})", user.id, user.email);
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: i64) -> Result<User, KilogError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(KilogError::UserNotFound { user_id })
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_auth_id(&self, auth_id: &str) -> Result<Option<User>, KilogError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE auth_id = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(auth_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, KilogError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Apply a partial update. An empty request returns the user unchanged.
    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> Result<User, KilogError> {
        request.validate()?;
        let current = self.get_user(user_id).await?;
        if request.is_empty() {
            return Ok(current);
        }

        let username = request.username.or(current.username);
        let last_login_at = request.last_login_at.or(current.last_login_at);
        let sql = format!(
            "UPDATE users SET username = ?, last_login_at = ?, updated_at = ? \
             WHERE id = ? RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&username)
            .bind(last_login_at)
            .bind(Utc::now())
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| user_conflict(e, &current.email, &current.auth_id, username.as_deref()))?;

        info!("Updated user {}", user_id);
        Ok(user)
    }

    /// Stamp `last_login_at` with the current time.
    #[instrument(skip(self))]
    pub async fn touch_last_login(&self, user_id: i64) -> Result<User, KilogError> {
        self.update_user(
            user_id,
            UpdateUserRequest {
                username: None,
                last_login_at: Some(Utc::now()),
            },
        )
        .await
    }

    /// Remove a user together with their workouts and custom exercises.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i64) -> Result<(), KilogError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(KilogError::UserNotFound { user_id });
        }
        info!("Deleted user {}", user_id);
        Ok(())
    }

    /// The user with their complete workout history, newest first.
    #[instrument(skip(self))]
    pub async fn get_user_details(&self, user_id: i64) -> Result<UserDetailsResponse, KilogError> {
        let user = self.get_user(user_id).await?;
        let workouts = self.load_all_workouts(user_id).await?;
        Ok(UserDetailsResponse {
            user: UserResponse::from(user),
            workouts,
        })
    }
}

/// Translate a unique-constraint failure on `users` into a 409.
fn user_conflict(err: sqlx::Error, email: &str, auth_id: &str, username: Option<&str>) -> KilogError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            let identifier = if message.contains("auth_id") {
                format!("Auth ID {auth_id}")
            } else if message.contains("username") {
                format!("Username {}", username.unwrap_or_default())
            } else {
                format!("Email {email}")
            };
            warn!("Unique constraint violated on users: {}", message);
            return KilogError::UserAlreadyExists { identifier };
        }
    }
    KilogError::from(err)
}
