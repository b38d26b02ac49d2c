//! Learner profiles

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::models::{User, UserRole};
use super::{conflict_or_database, parse_uuid};
use crate::Result;

const SELECT_COLUMNS: &str = r#"
    SELECT id, email, name, role, native_language, learning_language, created_at
    FROM users
"#;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub native_language: String,
    pub learning_language: String,
}

/// Profile fields a user may change; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub native_language: Option<String>,
    pub learning_language: Option<String>,
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    let role: String = row.get("role");
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(User {
        id: parse_uuid(&id)?,
        email: row.get("email"),
        name: row.get("name"),
        role: role.parse()?,
        native_language: row.get("native_language"),
        learning_language: row.get("learning_language"),
        created_at,
    })
}

/// Create a user; a taken email is [`crate::Error::Conflict`]
pub async fn create_user(pool: &SqlitePool, new: &NewUser) -> Result<User> {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: new.email.trim().to_lowercase(),
        name: new.name.clone(),
        role: new.role,
        native_language: new.native_language.trim().to_lowercase(),
        learning_language: new.learning_language.trim().to_lowercase(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, role, native_language, learning_language, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(&user.native_language)
    .bind(&user.learning_language)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| conflict_or_database(e, || format!("email '{}' is already registered", user.email)))?;

    Ok(user)
}

pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_user).transpose()
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let sql = format!("{} ORDER BY created_at DESC", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_to_user).collect()
}

/// Apply a profile update, returning the updated user (None if unknown)
pub async fn update_user(pool: &SqlitePool, id: Uuid, update: &UserUpdate) -> Result<Option<User>> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            name = COALESCE(?, name),
            native_language = COALESCE(?, native_language),
            learning_language = COALESCE(?, learning_language),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.name)
    .bind(update.native_language.as_ref().map(|c| c.trim().to_lowercase()))
    .bind(update.learning_language.as_ref().map(|c| c.trim().to_lowercase()))
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_user(pool, id).await
}

/// Delete a user and (by cascade) their progress rows
pub async fn delete_user(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
