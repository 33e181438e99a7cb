/// Database migration runner
///
/// Migrations are embedded from `teamboard-shared/migrations/` at compile time
/// and applied by [`crate::store::PgStore::probe`] the first time the
/// database answers.
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::db::pool::{create_lazy_pool, DatabaseConfig};
/// use teamboard_shared::db::migrations::run_migrations;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_lazy_pool(&DatabaseConfig::new("postgresql://localhost/teamboard"))?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Runs all pending migrations
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails; a
/// failed migration is rolled back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
