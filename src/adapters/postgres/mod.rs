//! PostgreSQL adapters.

mod session_store;

pub use session_store::PostgresSessionStore;

use sqlx::migrate::MigrateError;
use sqlx::PgPool;

/// Applies the bundled schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
