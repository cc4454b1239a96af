use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::warn;

use crate::error::Result;

/// Per-guild settings as stored. Option values are merged with each
/// extension's declared defaults when read, see `plugins::config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildConfig {
    /// `None` enables every loaded extension.
    #[serde(default)]
    pub enabled_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub logging_channel: Option<String>,
    #[serde(default)]
    pub extensions: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl GuildConfig {
    pub fn extension_enabled(&self, extension: &str) -> bool {
        self.enabled_extensions
            .as_ref()
            .is_none_or(|enabled| enabled.iter().any(|name| name == extension))
    }

    pub fn stored_options(&self, extension: &str) -> Option<&BTreeMap<String, serde_json::Value>> {
        self.extensions.get(extension)
    }

    pub fn set_option(&mut self, extension: &str, key: &str, value: serde_json::Value) {
        self.extensions
            .entry(extension.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

/// Get guild config, falling back to defaults when none is stored
pub async fn get_config(pool: &PgPool, guild_id: &str) -> Result<GuildConfig> {
    let stored = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT config FROM guild_configs WHERE guild_id = $1",
    )
    .bind(guild_id)
    .fetch_optional(pool)
    .await?;

    let Some(value) = stored else {
        return Ok(GuildConfig::default());
    };

    match serde_json::from_value(value) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(guild_id, error = %e, "stored guild config is malformed, using defaults");
            Ok(GuildConfig::default())
        }
    }
}

pub async fn save_config(pool: &PgPool, guild_id: &str, config: &GuildConfig) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO guild_configs (guild_id, config)
        VALUES ($1, $2)
        ON CONFLICT (guild_id) DO UPDATE SET config = EXCLUDED.config
        "#,
    )
    .bind(guild_id)
    .bind(Json(config))
    .execute(pool)
    .await?;

    Ok(())
}
