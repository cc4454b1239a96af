use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Warning {
    pub id: Uuid,
    pub user_id: String,
    pub guild_id: String,
    pub reason: String,
    pub time: DateTime<Utc>,
}

pub async fn get_warnings(pool: &PgPool, user_id: &str, guild_id: &str) -> Result<Vec<Warning>> {
    let warnings = sqlx::query_as::<_, Warning>(
        "SELECT id, user_id, guild_id, reason, time FROM warnings WHERE user_id = $1 AND guild_id = $2 ORDER BY time ASC",
    )
    .bind(user_id)
    .bind(guild_id)
    .fetch_all(pool)
    .await?;

    Ok(warnings)
}

pub async fn create_warning(
    pool: &PgPool,
    user_id: &str,
    guild_id: &str,
    reason: &str,
) -> Result<Warning> {
    let warning = sqlx::query_as::<_, Warning>(
        r#"
        INSERT INTO warnings (user_id, guild_id, reason)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, guild_id, reason, time
        "#,
    )
    .bind(user_id)
    .bind(guild_id)
    .bind(reason)
    .fetch_one(pool)
    .await?;

    Ok(warning)
}
