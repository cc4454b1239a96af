//! Per-invocation view of a slash command, with ids already parsed.

use std::fmt;

use chrono::{DateTime, Utc};
use twilight_model::guild::Permissions;
use twilight_model::id::{
    marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker},
    Id,
};

use crate::discord::interaction::{
    CommandOption, Interaction, PartialMember, Resolved, OPTION_SUB_COMMAND,
    OPTION_SUB_COMMAND_GROUP,
};
use crate::error::{Error, Result};
use crate::storage::guild_config::GuildConfig;

const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;
const CDN: &str = "https://cdn.discordapp.com";

#[derive(Debug, Clone)]
pub struct Invoker {
    pub id: Id<UserMarker>,
    pub name: String,
    pub roles: Vec<Id<RoleMarker>>,
    pub permissions: Permissions,
}

#[derive(Debug, Clone)]
pub struct CommandContext {
    pub guild_id: Id<GuildMarker>,
    pub channel_id: Option<Id<ChannelMarker>>,
    pub invoker: Invoker,
    pub token: String,
    /// Full command path, e.g. `note set`
    pub command: String,
    pub options: Vec<CommandOption>,
    pub resolved: Resolved,
    pub config: GuildConfig,
}

impl CommandContext {
    pub fn from_interaction(interaction: &Interaction, config: GuildConfig) -> Result<Self> {
        let guild_id = parse_id(interaction.guild_id.as_deref(), "guild_id")?;
        let channel_id = interaction
            .channel_id
            .as_deref()
            .and_then(|id| id.parse().ok())
            .and_then(Id::new_checked);

        let member = interaction
            .member
            .as_ref()
            .ok_or_else(|| Error::InvalidPayload("missing member".into()))?;
        let permissions = member
            .permissions
            .as_deref()
            .and_then(|p| p.parse::<u64>().ok())
            .map(Permissions::from_bits_truncate)
            .unwrap_or_else(Permissions::empty);
        let invoker = Invoker {
            id: parse_id(Some(&member.user.id), "member.user.id")?,
            name: member
                .user
                .global_name
                .clone()
                .unwrap_or_else(|| member.user.username.clone()),
            roles: member
                .roles
                .iter()
                .filter_map(|r| r.parse().ok())
                .filter_map(Id::new_checked)
                .collect(),
            permissions,
        };

        let data = interaction
            .data
            .as_ref()
            .ok_or_else(|| Error::InvalidPayload("missing data".into()))?;

        // Walk sub-command groups down to the leaf options
        let mut command = data.name.clone();
        let mut options = data.options.clone().unwrap_or_default();
        while let Some(sub) = options
            .iter()
            .find(|o| o.kind == OPTION_SUB_COMMAND || o.kind == OPTION_SUB_COMMAND_GROUP)
            .cloned()
        {
            command.push(' ');
            command.push_str(&sub.name);
            options = sub.options;
        }

        Ok(Self {
            guild_id,
            channel_id,
            invoker,
            token: interaction.token.clone(),
            command,
            options,
            resolved: data.resolved.clone(),
            config,
        })
    }

    fn option(&self, name: &str) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(|o| o.value.as_str())
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(|o| o.value.as_i64())
    }

    /// A user option, joined with its resolved user and member data.
    pub fn user(&self, name: &str) -> Option<TargetUser> {
        let id = self.string(name)?;
        let user = self.resolved.users.get(id)?;
        Some(TargetUser {
            id: id.parse().ok().and_then(Id::new_checked)?,
            username: user.username.clone(),
            global_name: user.global_name.clone(),
            avatar: user.avatar.clone(),
            bot: user.bot,
            member: self.resolved.members.get(id).cloned(),
        })
    }

    pub fn has_role(&self, role: Id<RoleMarker>) -> bool {
        self.invoker.roles.contains(&role)
    }
}

fn parse_id<T>(raw: Option<&str>, field: &str) -> Result<Id<T>> {
    raw.and_then(|id| id.parse::<u64>().ok())
        .and_then(Id::new_checked)
        .ok_or_else(|| Error::InvalidPayload(format!("missing {field}")))
}

/// The user named by a command option.
#[derive(Debug, Clone)]
pub struct TargetUser {
    pub id: Id<UserMarker>,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub bot: bool,
    /// Absent when the user is not in the guild
    pub member: Option<PartialMember>,
}

impl TargetUser {
    pub fn display_name(&self) -> &str {
        self.member
            .as_ref()
            .and_then(|m| m.nick.as_deref())
            .or(self.global_name.as_deref())
            .unwrap_or(&self.username)
    }

    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => {
                let ext = if hash.starts_with("a_") { "gif" } else { "png" };
                format!("{CDN}/avatars/{}/{hash}.{ext}", self.id)
            }
            None => format!("{CDN}/embed/avatars/{}.png", (self.id.get() >> 22) % 6),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let ms = i64::try_from(self.id.get() >> 22).ok()? + DISCORD_EPOCH_MS;
        DateTime::from_timestamp_millis(ms)
    }

    pub fn role_ids(&self) -> Vec<Id<RoleMarker>> {
        self.member
            .iter()
            .flat_map(|m| &m.roles)
            .filter_map(|r| r.parse().ok())
            .filter_map(Id::new_checked)
            .collect()
    }
}

impl fmt::Display for TargetUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
