use kilog_models::{User, WorkoutResponse};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,sqlx=warn,tower_http=info";

pub struct TracingService;

impl TracingService {
    /// Install the global subscriber. JSON lines in production, human
    /// readable otherwise. `RUST_LOG` overrides the default filter.
    pub fn init(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        if json {
            builder.json().try_init()?;
        } else {
            builder.try_init()?;
        }
        Ok(())
    }

    pub fn log_user_created(user: &User) {
        info!(
            user_id = user.id,
            auth_id = %user.auth_id,
            email = %user.email,
            "User created"
        );
    }

    pub fn log_user_deleted(auth_id: &str) {
        info!(auth_id = %auth_id, "User deleted");
    }

    pub fn log_workout_created(workout: &WorkoutResponse) {
        info!(
            workout_id = workout.id,
            user_id = workout.user_id,
            date = %workout.date,
            exercises = workout.exercises.len(),
            sets = workout.total_sets(),
            "Workout created"
        );
    }

    pub fn log_webhook_rejected(reason: &str) {
        warn!(reason = %reason, "Webhook rejected");
    }
}
