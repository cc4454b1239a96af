//! Command plugins and the registry that wires them to slash commands.

pub mod config;
pub mod giphy;
pub mod roll;
pub mod who;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};
use twilight_model::id::{
    marker::{GuildMarker, UserMarker},
    Id,
};

use crate::discord::context::CommandContext;
use crate::discord::embeds::deny_embed;
use crate::discord::interaction::{Reply, ResponseData};
use crate::error::{Error, Result};
use crate::plugins::config::{ExtensionConfig, ExtensionSettings};
use crate::storage::guild_config::{self, GuildConfig};
use crate::AppState;

pub const OPTION_STRING: u8 = 3;
pub const OPTION_INTEGER: u8 = 4;
pub const OPTION_USER: u8 = 6;

/// Names a plugin may declare but which never become commands.
const RESERVED_MARKER: char = '_';
const RESERVED_NAME: &str = "commands";

#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: u8,
    pub required: bool,
}

impl OptionSpec {
    pub fn string(name: &'static str, description: &'static str, required: bool) -> Self {
        Self { name, description, kind: OPTION_STRING, required }
    }

    pub fn integer(name: &'static str, description: &'static str, required: bool) -> Self {
        Self { name, description, kind: OPTION_INTEGER, required }
    }

    pub fn user(name: &'static str, description: &'static str) -> Self {
        Self { name, description, kind: OPTION_USER, required: true }
    }

    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "type": self.kind,
            "required": self.required,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub brief: &'static str,
    pub usage: &'static str,
    pub options: Vec<OptionSpec>,
    /// Non-empty for a slash-command group
    pub subcommands: Vec<CommandSpec>,
}

impl CommandSpec {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            brief: description,
            usage: "",
            options: vec![],
            subcommands: vec![],
        }
    }

    pub fn brief(mut self, brief: &'static str) -> Self {
        self.brief = brief;
        self
    }

    pub fn usage(mut self, usage: &'static str) -> Self {
        self.usage = usage;
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn subcommand(mut self, sub: CommandSpec) -> Self {
        self.subcommands.push(sub);
        self
    }

    fn options_json(&self) -> Vec<Value> {
        if self.subcommands.is_empty() {
            return self.options.iter().map(OptionSpec::to_json).collect();
        }
        self.subcommands
            .iter()
            .map(|sub| {
                json!({
                    "name": sub.name,
                    "description": sub.description,
                    "type": 1,
                    "options": sub.options_json(),
                })
            })
            .collect()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "type": 1,
            "dm_permission": false,
            "options": self.options_json(),
        })
    }
}

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Extension name used in guild configuration
    fn name(&self) -> &'static str;

    fn commands(&self) -> Vec<CommandSpec>;

    fn config(&self) -> Option<ExtensionConfig> {
        None
    }

    async fn handle(&self, state: &AppState, ctx: CommandContext) -> Result<Reply>;

    async fn on_member_join(
        &self,
        _state: &AppState,
        _guild_id: Id<GuildMarker>,
        _user_id: Id<UserMarker>,
        _config: &GuildConfig,
    ) -> Result<()> {
        Ok(())
    }
}

pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    /// Top-level command name -> index into `plugins`
    commands: HashMap<String, usize>,
}

impl PluginRegistry {
    /// Register the bundled plugins
    pub fn load_plugins() -> Result<Self> {
        let plugins: Vec<Arc<dyn Plugin>> = vec![
            Arc::new(roll::Roller),
            Arc::new(giphy::Giphy),
            Arc::new(who::Who),
        ];
        Self::from_plugins(plugins)
    }

    pub fn from_plugins(plugins: Vec<Arc<dyn Plugin>>) -> Result<Self> {
        let mut commands = HashMap::new();
        for (index, plugin) in plugins.iter().enumerate() {
            for spec in plugin.commands() {
                if spec.name.starts_with(RESERVED_MARKER) || spec.name == RESERVED_NAME {
                    warn!(command = spec.name, plugin = plugin.name(), "Skipping reserved command name");
                    continue;
                }
                if commands.insert(spec.name.to_string(), index).is_some() {
                    return Err(Error::Config(format!(
                        "command `{}` registered twice (plugin {})",
                        spec.name,
                        plugin.name()
                    )));
                }
                info!("Loading command `{}` from plugin {}", spec.name, plugin.name());
            }
        }
        Ok(Self { plugins, commands })
    }

    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn plugin_for(&self, command: &str) -> Option<&Arc<dyn Plugin>> {
        let top = command.split(' ').next().unwrap_or(command);
        self.commands.get(top).map(|&index| &self.plugins[index])
    }

    pub fn extension_config(&self, extension: &str) -> Option<ExtensionConfig> {
        self.plugins
            .iter()
            .find(|p| p.name() == extension)
            .and_then(|p| p.config())
    }

    /// Resolved options of `extension` for a guild
    pub fn settings(&self, extension: &str, config: &GuildConfig) -> ExtensionSettings {
        self.extension_config(extension)
            .map(|declared| declared.resolve(config.stored_options(extension)))
            .unwrap_or_default()
    }

    /// JSON body for a bulk overwrite of the application's commands
    pub fn application_commands(&self) -> Value {
        let mut specs: Vec<CommandSpec> = self
            .plugins
            .iter()
            .flat_map(|p| p.commands())
            .filter(|spec| self.commands.contains_key(spec.name))
            .collect();
        specs.sort_by_key(|spec| spec.name);
        Value::Array(specs.iter().map(CommandSpec::to_json).collect())
    }

    /// Run a slash command, turning handler errors into user-facing replies.
    pub async fn dispatch(&self, state: &AppState, ctx: CommandContext) -> Reply {
        info!(
            command = %ctx.command,
            user = %ctx.invoker.id,
            guild = %ctx.guild_id,
            "Slash command invoked"
        );

        let Some(plugin) = self.plugin_for(&ctx.command) else {
            warn!(command = %ctx.command, "Unknown command");
            return Reply::Message(ResponseData::embed(deny_embed("Unknown command")).ephemeral());
        };
        if !ctx.config.extension_enabled(plugin.name()) {
            return Reply::Message(
                ResponseData::embed(deny_embed(&format!(
                    "The `{}` extension is disabled in this server",
                    plugin.name()
                )))
                .ephemeral(),
            );
        }

        let command = ctx.command.clone();
        match plugin.handle(state, ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                if !matches!(e, Error::PermissionDenied(_) | Error::Validation(_)) {
                    tracing::error!(%command, error = %e, "Command failed");
                }
                Reply::Message(error_reply(&e))
            }
        }
    }

    /// Fan a member join out to every enabled plugin of the guild.
    pub async fn member_join(
        &self,
        state: &AppState,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<()> {
        let config = guild_config::get_config(&state.pool, &guild_id.to_string()).await?;
        for plugin in &self.plugins {
            if !config.extension_enabled(plugin.name()) {
                continue;
            }
            if let Err(e) = plugin.on_member_join(state, guild_id, user_id, &config).await {
                warn!(plugin = plugin.name(), %guild_id, %user_id, error = %e, "Member join handler failed");
            }
        }
        Ok(())
    }
}

/// Ephemeral reply describing why a command did not go through.
pub fn error_reply(error: &Error) -> ResponseData {
    let embed = match error {
        Error::PermissionDenied(message) | Error::Validation(message) => deny_embed(message),
        Error::RateLimited { retry_after, .. } => deny_embed(&format!(
            "That service is busy, try again in {} seconds",
            retry_after.as_secs().max(1)
        )),
        Error::Transport(_) => deny_embed("Could not reach that service, try again later"),
        other => return ResponseData::content(format!("❌ Error: {other}")).ephemeral(),
    };
    ResponseData::embed(embed).ephemeral()
}
