use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserNote {
    pub id: Uuid,
    pub user_id: String,
    pub guild_id: String,
    pub author_id: String,
    pub body: String,
    pub updated: DateTime<Utc>,
}

/// All notes for a user in a guild, newest first
pub async fn get_notes(pool: &PgPool, user_id: &str, guild_id: &str) -> Result<Vec<UserNote>> {
    let notes = sqlx::query_as::<_, UserNote>(
        r#"
        SELECT id, user_id, guild_id, author_id, body, updated
        FROM user_notes
        WHERE user_id = $1 AND guild_id = $2
        ORDER BY updated DESC
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .fetch_all(pool)
    .await?;

    Ok(notes)
}

pub async fn has_notes(pool: &PgPool, user_id: &str, guild_id: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM user_notes WHERE user_id = $1 AND guild_id = $2)",
    )
    .bind(user_id)
    .bind(guild_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

pub async fn create_note(
    pool: &PgPool,
    user_id: &str,
    guild_id: &str,
    author_id: &str,
    body: &str,
) -> Result<UserNote> {
    let note = sqlx::query_as::<_, UserNote>(
        r#"
        INSERT INTO user_notes (user_id, guild_id, author_id, body)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, guild_id, author_id, body, updated
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .bind(author_id)
    .bind(body)
    .fetch_one(pool)
    .await?;

    Ok(note)
}

pub async fn delete_note(pool: &PgPool, id: Uuid) -> Result<()> {
    let rows = sqlx::query("DELETE FROM user_notes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(Error::NotFound("note not found".into()));
    }
    Ok(())
}
