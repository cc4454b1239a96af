#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use twilight_model::id::{
    marker::{ApplicationMarker, ChannelMarker, GuildMarker, RoleMarker, UserMarker},
    Id,
};

use supportbot::config::{Config, HttpConfig, DEFAULT_GIPHY_API_URL};
use supportbot::discord::client::{DiscordInterface, FileAttachment, GuildRole};
use supportbot::discord::context::CommandContext;
use supportbot::discord::interaction::{Interaction, ResponseData};
use supportbot::error::{Error, Result};
use supportbot::plugins::PluginRegistry;
use supportbot::storage::guild_config::GuildConfig;
use supportbot::AppState;

pub const GUILD_ID: u64 = 10;
pub const MOD_ID: u64 = 20;
pub const TARGET_ID: u64 = 40;
pub const MODERATOR_ROLE: u64 = 30;
pub const READER_ROLE: u64 = 31;
pub const NOTED_ROLE: u64 = 32;

/// Records every call so tests can assert on side effects
#[derive(Default)]
pub struct MockDiscord {
    pub roles: Vec<GuildRole>,
    pub display_names: HashMap<u64, String>,
    pub fail_all: bool,
    /// Only file uploads fail
    pub fail_files: bool,
    pub added_roles: Mutex<Vec<(u64, u64)>>,
    pub removed_roles: Mutex<Vec<(u64, u64)>>,
    pub messages: Mutex<Vec<(u64, String)>>,
    pub followups: Mutex<Vec<ResponseData>>,
    pub files: Mutex<Vec<FileAttachment>>,
}

impl MockDiscord {
    /// A guild with Moderator, Reader and Noted roles
    pub fn with_roles() -> Self {
        Self {
            roles: vec![
                GuildRole { id: Id::new(MODERATOR_ROLE), name: "Moderator".into() },
                GuildRole { id: Id::new(READER_ROLE), name: "Reader".into() },
                GuildRole { id: Id::new(NOTED_ROLE), name: "Noted".into() },
            ],
            display_names: HashMap::from([(MOD_ID, "The Mod".to_string())]),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail_all {
            return Err(Error::Discord("Mock failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DiscordInterface for MockDiscord {
    fn application_id(&self) -> Id<ApplicationMarker> {
        Id::new(123)
    }

    async fn guild_roles(&self, _guild_id: Id<GuildMarker>) -> Result<Vec<GuildRole>> {
        self.check()?;
        Ok(self.roles.clone())
    }

    async fn add_member_role(
        &self,
        _guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<()> {
        self.check()?;
        self.added_roles.lock().unwrap().push((user_id.get(), role_id.get()));
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<()> {
        self.check()?;
        self.removed_roles.lock().unwrap().push((user_id.get(), role_id.get()));
        Ok(())
    }

    async fn member_display_name(
        &self,
        _guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<String>> {
        self.check()?;
        Ok(self.display_names.get(&user_id.get()).cloned())
    }

    async fn send_message(&self, channel_id: Id<ChannelMarker>, content: &str) -> Result<()> {
        self.check()?;
        self.messages
            .lock()
            .unwrap()
            .push((channel_id.get(), content.to_string()));
        Ok(())
    }

    async fn create_followup(&self, _token: &str, message: &ResponseData) -> Result<()> {
        self.check()?;
        self.followups.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn create_followup_with_file(
        &self,
        _token: &str,
        message: &ResponseData,
        file: FileAttachment,
    ) -> Result<()> {
        self.check()?;
        if self.fail_files {
            return Err(Error::Discord("Upload rejected".into()));
        }
        self.followups.lock().unwrap().push(message.clone());
        self.files.lock().unwrap().push(file);
        Ok(())
    }
}

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

/// Headers Discord would send for `body`
pub fn sign(body: &str, timestamp: &str) -> String {
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    hex::encode(signing_key().sign(&message).to_bytes())
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        discord_public_key: hex::encode(signing_key().verifying_key().to_bytes()),
        discord_bot_token: "token".into(),
        discord_application_id: 123,
        giphy_api_key: Some("test-key".into()),
        giphy_api_url: DEFAULT_GIPHY_API_URL.into(),
        http: HttpConfig::default(),
        confirm_timeout: Duration::from_secs(5),
        gateway_enabled: false,
        host: "127.0.0.1".into(),
        port: 0,
    }
}

/// Pool that never connects, for flows that stay out of the database
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap()
}

pub fn create_state_with(pool: PgPool, discord: Arc<MockDiscord>, config: Config) -> AppState {
    AppState::new(config, pool, discord, PluginRegistry::load_plugins().unwrap()).unwrap()
}

pub fn create_state(pool: PgPool, discord: Arc<MockDiscord>) -> AppState {
    create_state_with(pool, discord, test_config())
}

/// A slash-command interaction from the moderator in the test guild.
///
/// `path` is the command with any sub-command, e.g. `"note set"`.
pub fn command_interaction(path: &str, options: Value, permissions: &str, roles: &[u64]) -> Value {
    let mut parts = path.split(' ');
    let name = parts.next().unwrap();
    let options = match parts.next() {
        Some(sub) => json!([{ "name": sub, "type": 1, "options": options }]),
        None => options,
    };
    json!({
        "type": 2,
        "id": "1",
        "token": "interaction-token",
        "guild_id": GUILD_ID.to_string(),
        "channel_id": "11",
        "member": {
            "user": { "id": MOD_ID.to_string(), "username": "mod" },
            "roles": roles.iter().map(u64::to_string).collect::<Vec<_>>(),
            "permissions": permissions
        },
        "data": {
            "name": name,
            "options": options,
            "resolved": {
                "users": {
                    TARGET_ID.to_string(): { "id": TARGET_ID.to_string(), "username": "spammer" },
                    MOD_ID.to_string(): { "id": MOD_ID.to_string(), "username": "mod" }
                },
                "members": {
                    TARGET_ID.to_string(): { "roles": [], "joined_at": "2024-01-01T00:00:00+00:00" },
                    MOD_ID.to_string(): { "roles": [MODERATOR_ROLE.to_string()] }
                }
            }
        }
    })
}

pub fn command_context(
    path: &str,
    options: Value,
    permissions: &str,
    roles: &[u64],
    config: GuildConfig,
) -> CommandContext {
    let interaction: Interaction =
        serde_json::from_value(command_interaction(path, options, permissions, roles)).unwrap();
    CommandContext::from_interaction(&interaction, config).unwrap()
}

/// Permission bitfield with KICK_MEMBERS
pub const KICK: &str = "2";
