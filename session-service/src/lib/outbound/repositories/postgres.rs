use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::Role;
use crate::domain::session::models::User;
use crate::domain::session::models::UserCredentials;
use crate::domain::session::models::UserId;
use crate::domain::session::models::Username;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::UserRepository;

/// Open a pool and bring the schema up to date.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, SessionError> {
    let options = url.parse::<PgConnectOptions>().map_err(database_error)?;
    connect_with(options, max_connections).await
}

pub async fn connect_with(
    options: PgConnectOptions,
    max_connections: u32,
) -> Result<PgPool, SessionError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(database_error)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

    Ok(pool)
}

fn database_error(e: sqlx::Error) -> SessionError {
    SessionError::DatabaseError(e.to_string())
}

/// A stored value that no longer passes domain validation.
fn corrupt_row(column: &str, e: impl std::fmt::Display) -> SessionError {
    SessionError::DatabaseError(format!("Stored users.{} is invalid: {}", column, e))
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn credentials_from_row(row: &PgRow) -> Result<UserCredentials, SessionError> {
        let role: String = row.try_get("role").map_err(database_error)?;

        Ok(UserCredentials {
            user: User {
                id: UserId(row.try_get("id").map_err(database_error)?),
                username: Username::new(row.try_get("username").map_err(database_error)?)
                    .map_err(|e| corrupt_row("username", e))?,
                email: EmailAddress::new(row.try_get("email").map_err(database_error)?)
                    .map_err(|e| corrupt_row("email", e))?,
                role: role.parse::<Role>().map_err(|e| corrupt_row("role", e))?,
                created_at: row.try_get("created_at").map_err(database_error)?,
                updated_at: row.try_get("updated_at").map_err(database_error)?,
            },
            password_hash: row.try_get("password_hash").map_err(database_error)?,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, credentials: UserCredentials) -> Result<User, SessionError> {
        let user = credentials.user;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&credentials.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return SessionError::EmailAlreadyExists(user.email.to_string());
                }
            }
            database_error(e)
        })?;

        Ok(user)
    }

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, SessionError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserCredentials>, SessionError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.as_ref().map(Self::credentials_from_row).transpose()
    }
}

pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn create(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, SessionError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, user_agent, ip, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.0)
        .bind(record.user_id.0)
        .bind(&record.token)
        .bind(&record.user_agent)
        .bind(&record.ip)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(record)
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, SessionError> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() > 0)
    }
}
