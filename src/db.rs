use rocket_db_pools::{sqlx, Database};

/// Credential database, configured as `auth_db` under Rocket's `databases`.
#[derive(Database)]
#[database("auth_db")]
pub struct AuthDb(sqlx::PgPool);

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
