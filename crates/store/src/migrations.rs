use sqlx::{Pool, Sqlite};
use tracing::info;

/// Embedded migration scripts. Each one is idempotent so startup can run
/// the full list against an existing database.
const MIGRATION_001_INITIAL: &str = include_str!("../migrations/001_initial.sql");
const MIGRATION_002_SYSTEM_EXERCISES: &str =
    include_str!("../migrations/002_system_exercises.sql");

const MIGRATIONS: &[(&str, &str)] = &[
    ("001 initial schema", MIGRATION_001_INITIAL),
    ("002 system exercises", MIGRATION_002_SYSTEM_EXERCISES),
];

/// Run all embedded migrations
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    for (name, sql) in MIGRATIONS {
        info!("Running migration {}", name);
        sqlx::query(sql).execute(pool).await?;
    }

    info!("All migrations completed successfully");
    Ok(())
}
