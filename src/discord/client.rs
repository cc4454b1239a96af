use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use tracing::warn;
use twilight_http::error::ErrorType;
use twilight_http::Client;
use twilight_model::id::{
    marker::{ApplicationMarker, ChannelMarker, GuildMarker, RoleMarker, UserMarker},
    Id,
};

use crate::discord::interaction::ResponseData;
use crate::error::{Error, Result};

const API_BASE: &str = "https://discord.com/api/v10";

/// Tries for a follow-up answered with 404
const FOLLOWUP_ATTEMPTS: u32 = 3;
const FOLLOWUP_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildRole {
    pub id: Id<RoleMarker>,
    pub name: String,
}

/// A file sent alongside a follow-up message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything the plugins ask of Discord, so tests can swap in a mock
#[async_trait]
pub trait DiscordInterface: Send + Sync {
    fn application_id(&self) -> Id<ApplicationMarker>;

    async fn guild_roles(&self, guild_id: Id<GuildMarker>) -> Result<Vec<GuildRole>>;
    async fn add_member_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<()>;
    async fn remove_member_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<()>;
    /// Nickname, global name or username of a guild member; `None` once they left
    async fn member_display_name(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<String>>;

    async fn send_message(&self, channel_id: Id<ChannelMarker>, content: &str) -> Result<()>;
    async fn create_followup(&self, token: &str, message: &ResponseData) -> Result<()>;
    async fn create_followup_with_file(
        &self,
        token: &str,
        message: &ResponseData,
        file: FileAttachment,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct DiscordClient {
    pub http: Arc<Client>,
    pub application_id: Id<ApplicationMarker>,
    webhooks: reqwest::Client,
    api_base: String,
}

impl DiscordClient {
    pub fn new(token: &str, application_id: u64) -> Self {
        let http = Arc::new(Client::new(token.to_string()));
        Self {
            http,
            application_id: Id::new(application_id),
            webhooks: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
        }
    }

    fn followup_url(&self, token: &str) -> String {
        format!("{}/webhooks/{}/{}", self.api_base, self.application_id, token)
    }

    /// Send a follow-up built by `build`, retrying while the webhook is unknown.
    ///
    /// Discord only accepts follow-ups once it has processed the deferred
    /// response, which can land after a task spawned by the handler starts.
    async fn send_followup<F>(&self, build: F) -> Result<()>
    where
        F: Fn() -> Result<RequestBuilder> + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let response = build()?
                .send()
                .await
                .map_err(|e| Error::Discord(e.to_string()))?;
            if response.status() == StatusCode::NOT_FOUND && attempt < FOLLOWUP_ATTEMPTS {
                warn!(attempt, "Follow-up webhook not ready yet, retrying");
                tokio::time::sleep(FOLLOWUP_RETRY_DELAY * attempt).await;
                attempt += 1;
                continue;
            }
            response
                .error_for_status()
                .map_err(|e| Error::Discord(e.to_string()))?;
            return Ok(());
        }
    }
}

#[async_trait]
impl DiscordInterface for DiscordClient {
    fn application_id(&self) -> Id<ApplicationMarker> {
        self.application_id
    }

    async fn guild_roles(&self, guild_id: Id<GuildMarker>) -> Result<Vec<GuildRole>> {
        let roles = self
            .http
            .roles(guild_id)
            .await
            .map_err(|e| Error::Discord(e.to_string()))?
            .model()
            .await
            .map_err(|e| Error::Discord(e.to_string()))?;

        Ok(roles
            .into_iter()
            .map(|role| GuildRole {
                id: role.id,
                name: role.name,
            })
            .collect())
    }

    async fn add_member_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<()> {
        self.http
            .add_guild_member_role(guild_id, user_id, role_id)
            .await
            .map_err(|e| Error::Discord(e.to_string()))?;
        Ok(())
    }

    async fn remove_member_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<()> {
        self.http
            .remove_guild_member_role(guild_id, user_id, role_id)
            .await
            .map_err(|e| Error::Discord(e.to_string()))?;
        Ok(())
    }

    async fn member_display_name(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<String>> {
        let response = match self.http.guild_member(guild_id, user_id).await {
            Ok(response) => response,
            Err(e) if matches!(e.kind(), ErrorType::Response { status, .. } if status.get() == 404) => {
                return Ok(None)
            }
            Err(e) => return Err(Error::Discord(e.to_string())),
        };
        let member = response
            .model()
            .await
            .map_err(|e| Error::Discord(e.to_string()))?;

        Ok(Some(
            member
                .nick
                .or(member.user.global_name)
                .unwrap_or(member.user.name),
        ))
    }

    async fn send_message(&self, channel_id: Id<ChannelMarker>, content: &str) -> Result<()> {
        self.http
            .create_message(channel_id)
            .content(content)
            .await
            .map_err(|e| Error::Discord(e.to_string()))?;
        Ok(())
    }

    async fn create_followup(&self, token: &str, message: &ResponseData) -> Result<()> {
        let url = self.followup_url(token);
        self.send_followup(|| Ok(self.webhooks.post(&url).json(message)))
            .await
    }

    async fn create_followup_with_file(
        &self,
        token: &str,
        message: &ResponseData,
        file: FileAttachment,
    ) -> Result<()> {
        let mut payload =
            serde_json::to_value(message).map_err(|e| Error::Internal(e.to_string()))?;
        payload["attachments"] = serde_json::json!([{ "id": 0, "filename": file.filename }]);

        let payload = payload.to_string();
        let url = self.followup_url(token);

        self.send_followup(|| {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.content_type)
                .map_err(|e| Error::Internal(e.to_string()))?;
            let form = Form::new()
                .text("payload_json", payload.clone())
                .part("files[0]", part);
            Ok(self.webhooks.post(&url).multipart(form))
        })
        .await
    }
}
