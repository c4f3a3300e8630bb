use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::{auth::password::hash_password, error::AppError};

/// Coarse permission tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// User record. The password hash never leaves the process: it is skipped
/// on serialization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Partial update. `password_is_hashed` is the explicit double-hash guard:
/// when false, a supplied password is hashed before persistence; when true
/// it is stored as-is (it already came out of the hasher).
#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_is_hashed: bool,
    pub role: Option<Role>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

impl User {
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(
        db: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(db)
                .await?;
        Ok(user)
    }

    /// Insert a new user. The plaintext password is hashed here; uniqueness
    /// races resolve atomically at the UNIQUE constraints.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let password_hash = hash_password(password)?;
        let now = OffsetDateTime::now_utc();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(role)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
        .map_err(conflict_or_internal)?;
        Ok(user)
    }

    /// Apply a partial update: only supplied fields change.
    pub async fn update(db: &SqlitePool, id: i64, changes: UserChanges) -> Result<User, AppError> {
        let current = User::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let username = changes.username.unwrap_or(current.username);
        let email = changes.email.unwrap_or(current.email);
        let role = changes.role.unwrap_or(current.role);
        let password_hash = match changes.password {
            Some(p) if changes.password_is_hashed => p,
            Some(p) => hash_password(&p)?,
            None => current.password_hash,
        };

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET username = ?, email = ?, password_hash = ?, role = ?, updated_at = ?
             WHERE id = ?
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(role)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(conflict_or_internal)?;
        Ok(user)
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    /// All users in insertion order.
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }
}

/// Unique-constraint violations become Conflict; anything else is Internal.
fn conflict_or_internal(e: sqlx::Error) -> AppError {
    match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => {
            let message = if db_err.message().contains("users.email") {
                "User already exists"
            } else {
                "Username already taken"
            };
            AppError::Conflict(message.into())
        }
        _ => AppError::Internal(e.into()),
    }
}
