use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body returned for every failed API request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ErrorShape {
    pub error: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum KilogError {
    // System and infrastructure
    #[error("System Database Error: {reason}")]
    Database { reason: String },

    #[error("System Database Error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Integrity Error: {detail}")]
    Integrity { detail: String },

    #[error("Internal server error: {reason}")]
    Internal { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // Not found
    #[error("User with id {user_id} not found.")]
    UserNotFound { user_id: i64 },

    #[error("Workout with id {workout_id} not found.")]
    WorkoutNotFound { workout_id: i64 },

    #[error("Exercise with id {exercise_id} not found.")]
    ExerciseNotFound { exercise_id: i64 },

    #[error("Set with id {set_id} not found.")]
    SetNotFound { set_id: i64 },

    // Conflicts
    #[error("User with identifier '{identifier}' already exists.")]
    UserAlreadyExists { identifier: String },

    #[error("{message}")]
    ResourceConflict { message: String },

    // Business rules
    #[error("Invalid metric value: {detail}")]
    InvalidMetric { detail: String },

    #[error("Cannot save an empty workout. Add at least one exercise.")]
    EmptyWorkout,

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    // Authorization
    #[error("User {user_id} does not have permission to access this {resource}.")]
    PermissionDenied { resource: String, user_id: i64 },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },
}

impl KilogError {
    pub fn permission_denied(resource: impl Into<String>, user_id: i64) -> Self {
        KilogError::PermissionDenied {
            resource: resource.into(),
            user_id,
        }
    }

    pub fn to_error_shape(&self) -> ErrorShape {
        ErrorShape {
            error: self.error_type().to_string(),
            message: self.to_string(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self.http_status() {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            409 => "Conflict",
            _ => "Internal Error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            KilogError::Database { .. } => 500,
            KilogError::Sqlx(_) => 500,
            KilogError::Integrity { .. } => 500,
            KilogError::Internal { .. } => 500,
            KilogError::Config { .. } => 500,
            KilogError::UserNotFound { .. } => 404,
            KilogError::WorkoutNotFound { .. } => 404,
            KilogError::ExerciseNotFound { .. } => 404,
            KilogError::SetNotFound { .. } => 404,
            KilogError::UserAlreadyExists { .. } => 409,
            KilogError::ResourceConflict { .. } => 409,
            KilogError::InvalidMetric { .. } => 400,
            KilogError::EmptyWorkout => 400,
            KilogError::InvalidRequest { .. } => 400,
            KilogError::PermissionDenied { .. } => 403,
            KilogError::Unauthorized { .. } => 401,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status() == 404
    }
}
