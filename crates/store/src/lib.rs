//! SQLite persistence for users, the exercise catalog, workouts and the
//! analytics read model.

pub mod analytics;
pub mod exercises;
pub mod migrations;
pub mod users;
pub mod workouts;

use kilog_models::KilogError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

pub const MEMORY_URL: &str = "sqlite::memory:";

/// Handle to the database. Cheap to clone; all clones share one pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Wrap an existing pool and bring its schema up to date.
    pub async fn new(pool: SqlitePool) -> Result<Self, KilogError> {
        migrations::run_migrations(&pool)
            .await
            .map_err(|e| KilogError::Database {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Open (creating if needed) the database at `db_url`.
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self, KilogError> {
        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens its own empty database, so the
        // pool must hold exactly one that never gets recycled.
        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            // get_filename consumes the options.
            let filename = options.clone().get_filename();
            if let Some(dir) = filename.parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir).map_err(|e| KilogError::Database {
                        reason: format!("cannot create {}: {}", dir.display(), e),
                    })?;
                }
            }
        }

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await?
        };

        info!("Connected to database {}", db_url);
        Self::new(pool).await
    }

    pub async fn in_memory() -> Result<Self, KilogError> {
        Self::connect(MEMORY_URL, 1).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness probe used by the health endpoint.
    pub async fn ping(&self) -> Result<(), KilogError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
