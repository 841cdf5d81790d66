use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::{self, PgPool, Row, postgres::PgRow};

use crate::auth::store::{Credential, CredentialStore, NewCredential};
use crate::auth::{AuthError, AuthResult};

const CREDENTIAL_COLUMNS: &str = "id, username, email, password_hash, enabled, created_at";

/// PostgreSQL-backed credential store over the `credentials` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> AuthResult<Option<Credential>> {
        let sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE {column} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| credential_from_row(&row)).transpose()
    }
}

#[rocket::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Credential>> {
        self.fetch_one_where("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Credential>> {
        self.fetch_one_where("email", email).await
    }

    async fn insert(&self, credential: NewCredential) -> AuthResult<Credential> {
        let sql = format!(
            "INSERT INTO credentials (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {CREDENTIAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&credential.username)
            .bind(&credential.email)
            .bind(&credential.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        credential_from_row(&row)
    }

    async fn set_enabled(&self, username: &str, enabled: bool) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE credentials SET enabled = $1, updated_at = NOW() WHERE username = $2",
        )
        .bind(enabled)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn credential_from_row(row: &PgRow) -> AuthResult<Credential> {
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(Credential {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        enabled: row.try_get("enabled")?,
        created_at,
    })
}

fn map_unique_violation(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AuthError::DuplicateSubject
        }
        _ => AuthError::from(err),
    }
}
