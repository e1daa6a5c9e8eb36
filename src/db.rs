use rocket_db_pools::{Database, sqlx};
use rocket_db_pools::sqlx::{PgPool, migrate::Migrator};

#[derive(Database)]
#[database("clinic_db")]
pub struct ClinicDb(sqlx::PgPool);

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations.
///
/// Idempotent: migrations that have already been applied are skipped, and
/// checksum drift aborts startup before the API serves traffic.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
