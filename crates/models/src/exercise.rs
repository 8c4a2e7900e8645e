use crate::KilogError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXERCISE_LIST_LIMIT: i64 = 100;

/// Catalog entry such as "Bench Press". `user_id == None` marks a system
/// exercise that every user can see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub user_id: Option<i64>,
}

impl Exercise {
    pub fn is_system(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn is_visible_to(&self, user_id: i64) -> bool {
        self.user_id.map_or(true, |owner| owner == user_id)
    }

    /// Write access: only custom exercises owned by `user_id`.
    pub fn check_writable_by(&self, user_id: i64) -> Result<(), KilogError> {
        match self.user_id {
            None => Err(KilogError::permission_denied("System Exercises", user_id)),
            Some(owner) if owner != user_id => {
                Err(KilogError::permission_denied("Other User's Exercise", user_id))
            }
            Some(_) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateExerciseRequest {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl CreateExerciseRequest {
    pub fn validate(&self) -> Result<(), KilogError> {
        validate_exercise_name(&self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UpdateExerciseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl UpdateExerciseRequest {
    pub fn validate(&self) -> Result<(), KilogError> {
        match &self.name {
            Some(name) => validate_exercise_name(name),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListExercisesQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

fn validate_exercise_name(name: &str) -> Result<(), KilogError> {
    if name.trim().is_empty() {
        return Err(KilogError::InvalidRequest {
            reason: "exercise name must not be empty".to_string(),
        });
    }
    Ok(())
}
