//! `/whois` and the `/note` command group: moderator notes attached to users.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use twilight_model::guild::Permissions;
use twilight_model::id::{
    marker::{GuildMarker, UserMarker},
    Id,
};

use crate::discord::client::{FileAttachment, GuildRole};
use crate::discord::confirm::{Confirmation, ConfirmResponse};
use crate::discord::context::{CommandContext, TargetUser};
use crate::discord::embeds::{
    add_field, basic_embed, confirm_embed, deny_embed, with_footer, with_thumbnail,
    COLOR_DARK_BLUE,
};
use crate::discord::interaction::{Reply, ResponseData};
use crate::error::{Error, Result};
use crate::plugins::config::{Datatype, ExtensionConfig, ExtensionSettings};
use crate::plugins::{error_reply, CommandSpec, OptionSpec, Plugin};
use crate::storage::guild_config::GuildConfig;
use crate::storage::{notes, warnings};
use crate::AppState;

pub const NAME: &str = "who";

/// Notes shown inline in `/whois`; `/note all` exports the rest
const WHOIS_NOTES: usize = 3;

pub struct Who;

impl Who {
    fn settings(&self, config: &GuildConfig) -> ExtensionSettings {
        who_config().resolve(config.stored_options(NAME))
    }
}

pub fn who_config() -> ExtensionConfig {
    ExtensionConfig::new()
        .add(
            "note_role",
            Datatype::Str,
            "Note role",
            "The name of the role to be added when a note is added to a user",
            Value::Null,
        )
        .add(
            "note_bypass",
            Datatype::List,
            "Note bypass list",
            "A list of roles that shouldn't have notes set or the note roll assigned",
            json!(["Moderator"]),
        )
        .add(
            "note_readers",
            Datatype::List,
            "Note Reader Roles",
            "Users with roles in this list will be able to use whois",
            json!([]),
        )
}

#[async_trait]
impl Plugin for Who {
    fn name(&self) -> &'static str {
        NAME
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("whois", "Gets Discord user information")
                .brief("Gets user data")
                .usage("@user")
                .option(OptionSpec::user("user", "The user to look up")),
            CommandSpec::new("note", "Command Group for the Notes Extension")
                .subcommand(
                    CommandSpec::new(
                        "set",
                        "Sets a note for a user, which can be read later from their whois",
                    )
                    .brief("Sets a note for a user")
                    .usage("@user [note]")
                    .option(OptionSpec::user("user", "The user to note"))
                    .option(OptionSpec::string("body", "The note", true)),
                )
                .subcommand(
                    CommandSpec::new("clear", "Clears all existing notes for a user")
                        .brief("Clears all notes for a user")
                        .usage("@user")
                        .option(OptionSpec::user("user", "The user to clear")),
                )
                .subcommand(
                    CommandSpec::new("all", "Gets all notes for a user instead of just new ones")
                        .brief("Gets all notes for a user")
                        .usage("@user")
                        .option(OptionSpec::user("user", "The user to export")),
                ),
        ]
    }

    fn config(&self) -> Option<ExtensionConfig> {
        Some(who_config())
    }

    async fn handle(&self, state: &AppState, ctx: CommandContext) -> Result<Reply> {
        let settings = self.settings(&ctx.config);
        match ctx.command.as_str() {
            "whois" => do_whois(state, &ctx, &settings).await.map(Reply::Message),
            "note set" => do_set_note(state, &ctx, &settings).await.map(Reply::Message),
            "note clear" => clear_notes(state, ctx, settings).await,
            "note all" => all_notes(state, ctx, &settings).await,
            other => Err(Error::NotFound(format!("command `{other}`"))),
        }
    }

    async fn on_member_join(
        &self,
        state: &AppState,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        config: &GuildConfig,
    ) -> Result<()> {
        let settings = self.settings(config);
        let Some(role) = note_role(state, guild_id, &settings).await? else {
            return Ok(());
        };
        if !notes::has_notes(&state.pool, &user_id.to_string(), &guild_id.to_string()).await? {
            return Ok(());
        }

        state.discord.add_member_role(guild_id, user_id, role.id).await?;

        let message = format!("Found noted user with ID {user_id} joining - re-adding role");
        info!(%guild_id, %user_id, role = %role.name, "{}", message);
        if let Some(channel) = config
            .logging_channel
            .as_deref()
            .and_then(|c| c.parse().ok())
            .and_then(Id::new_checked)
        {
            state.discord.send_message(channel, &message).await?;
        }
        Ok(())
    }
}

fn target(ctx: &CommandContext) -> Result<TargetUser> {
    ctx.user("user")
        .ok_or_else(|| Error::InvalidPayload("missing user option".into()))
}

fn require_kick_members(ctx: &CommandContext) -> Result<()> {
    if ctx.invoker.permissions.contains(Permissions::KICK_MEMBERS) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(
            "You need the Kick Members permission to use this command".into(),
        ))
    }
}

/// Invoker must hold one of the guild's `note_readers` roles.
pub async fn check_reader(
    state: &AppState,
    ctx: &CommandContext,
    settings: &ExtensionSettings,
) -> Result<()> {
    let readers = settings.list("note_readers");
    if readers.is_empty() {
        return Err(Error::PermissionDenied(
            "There aren't any `note_readers` roles set in the config!".into(),
        ));
    }

    let roles = state.discord.guild_roles(ctx.guild_id).await?;
    let allowed = roles
        .iter()
        .filter(|role| readers.contains(&role.name))
        .any(|role| ctx.has_role(role.id));
    if !allowed {
        return Err(Error::PermissionDenied(
            "You don't have a role that can read notes".into(),
        ));
    }
    Ok(())
}

async fn note_role(
    state: &AppState,
    guild_id: Id<GuildMarker>,
    settings: &ExtensionSettings,
) -> Result<Option<GuildRole>> {
    let Some(name) = settings.string("note_role") else {
        return Ok(None);
    };
    let roles = state.discord.guild_roles(guild_id).await?;
    Ok(roles.into_iter().find(|role| role.name == name))
}

/// Display name of a note author, or the raw id once they are gone.
async fn author_name(state: &AppState, guild_id: Id<GuildMarker>, author_id: &str) -> String {
    let Some(id) = author_id.parse().ok().and_then(Id::new_checked) else {
        return author_id.to_string();
    };
    match state.discord.member_display_name(guild_id, id).await {
        Ok(Some(name)) => name,
        Ok(None) => author_id.to_string(),
        Err(e) => {
            warn!(%guild_id, author_id, error = %e, "Could not resolve note author");
            author_id.to_string()
        }
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub async fn do_whois(
    state: &AppState,
    ctx: &CommandContext,
    settings: &ExtensionSettings,
) -> Result<ResponseData> {
    check_reader(state, ctx, settings).await?;
    let user = target(ctx)?;
    let guild_id = ctx.guild_id.to_string();
    let user_id = user.id.to_string();

    let description = if user.bot {
        "**Note: this is a bot account!**"
    } else {
        ""
    };
    let mut embed = with_thumbnail(
        basic_embed(&format!("User info for `{user}`"), description, COLOR_DARK_BLUE),
        &user.avatar_url(),
    );

    let created = user.created_at().map(format_time).unwrap_or_else(|| "Unknown".into());
    let joined = user
        .member
        .as_ref()
        .and_then(|m| m.joined_at.as_deref())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| format_time(t.with_timezone(&Utc)))
        .unwrap_or_else(|| "Unknown".into());
    add_field(&mut embed, "Created at", created, true);
    add_field(&mut embed, "Joined at", joined, true);
    add_field(&mut embed, "Nickname", user.display_name(), true);

    let role_ids = user.role_ids();
    let role_names = if role_ids.is_empty() {
        String::new()
    } else {
        state
            .discord
            .guild_roles(ctx.guild_id)
            .await?
            .into_iter()
            .filter(|role| role_ids.contains(&role.id))
            .map(|role| role.name)
            .collect::<Vec<_>>()
            .join(", ")
    };
    add_field(
        &mut embed,
        "Roles",
        if role_names.is_empty() { "No roles".to_string() } else { role_names },
        true,
    );

    if ctx.invoker.permissions.contains(Permissions::KICK_MEMBERS) {
        for warning in warnings::get_warnings(&state.pool, &user_id, &guild_id).await? {
            add_field(
                &mut embed,
                format!("**Warning ({})**", warning.time.date_naive()),
                format!("*{}*", warning.reason),
                false,
            );
        }
    }

    let user_notes = notes::get_notes(&state.pool, &user_id, &guild_id).await?;
    for note in user_notes.iter().take(WHOIS_NOTES) {
        let author = author_name(state, ctx.guild_id, &note.author_id).await;
        let body = if note.body.is_empty() {
            "*None*".to_string()
        } else {
            format!("*{}*", note.body)
        };
        add_field(
            &mut embed,
            format!("Note from {author} ({})", note.updated.date_naive()),
            body,
            false,
        );
    }
    let embed = with_footer(embed, &format!("{} total notes", user_notes.len()));

    Ok(ResponseData::embed(embed).ephemeral())
}

pub async fn do_set_note(
    state: &AppState,
    ctx: &CommandContext,
    settings: &ExtensionSettings,
) -> Result<ResponseData> {
    require_kick_members(ctx)?;
    let user = target(ctx)?;
    let body = ctx.string("body").unwrap_or_default();

    if user.id == ctx.invoker.id {
        return Err(Error::Validation("You cannot add a note for yourself".into()));
    }

    let roles = state.discord.guild_roles(ctx.guild_id).await?;
    let user_roles = user.role_ids();
    for name in settings.list("note_bypass") {
        let Some(role) = roles.iter().find(|role| role.name == name) else {
            continue;
        };
        if user_roles.contains(&role.id) {
            return Err(Error::PermissionDenied(format!(
                "You cannot assign notes to `{user}` because they have `{}` role",
                role.name
            )));
        }
    }

    notes::create_note(
        &state.pool,
        &user.id.to_string(),
        &ctx.guild_id.to_string(),
        &ctx.invoker.id.to_string(),
        body,
    )
    .await?;

    let note_role = settings
        .string("note_role")
        .and_then(|name| roles.iter().find(|role| role.name == name));
    let Some(role) = note_role else {
        return Ok(ResponseData::embed(confirm_embed(&format!(
            "Note created for `{user}`, but no note role is configured so no role was added"
        )))
        .ephemeral());
    };

    state
        .discord
        .add_member_role(ctx.guild_id, user.id, role.id)
        .await?;
    info!(
        guild = %ctx.guild_id,
        user = %user.id,
        role = %role.name,
        "First note was added by {}",
        ctx.invoker.name
    );

    Ok(ResponseData::embed(confirm_embed(&format!("Note created for `{user}`"))).ephemeral())
}

async fn clear_notes(
    state: &AppState,
    ctx: CommandContext,
    settings: ExtensionSettings,
) -> Result<Reply> {
    require_kick_members(&ctx)?;
    let user = target(&ctx)?;
    let existing =
        notes::get_notes(&state.pool, &user.id.to_string(), &ctx.guild_id.to_string()).await?;
    if existing.is_empty() {
        return Err(Error::Validation("There are no notes for that user".into()));
    }

    let confirmation = state.confirms.open(ctx.invoker.id);
    let state = state.clone();
    tokio::spawn(async move {
        let result =
            confirm_and_clear(&state, &ctx, &settings, &user, existing.len(), confirmation).await;
        if let Err(e) = result {
            error!(guild = %ctx.guild_id, user = %user.id, error = %e, "Clearing notes failed");
            report_failure(&state, &ctx, &e).await;
        }
    });

    Ok(Reply::Deferred { ephemeral: true })
}

/// Tell the invoker a deferred command failed.
async fn report_failure(state: &AppState, ctx: &CommandContext, error: &Error) {
    if let Err(e) = state.discord.create_followup(&ctx.token, &error_reply(error)).await {
        warn!(guild = %ctx.guild_id, error = %e, "Could not report command failure");
    }
}

async fn confirm_and_clear(
    state: &AppState,
    ctx: &CommandContext,
    settings: &ExtensionSettings,
    user: &TargetUser,
    count: usize,
    confirmation: Confirmation,
) -> Result<()> {
    let prompt = ResponseData::content(format!("Are you sure you want to clear {count} notes?"))
        .with_components(confirmation.components())
        .ephemeral();
    state.discord.create_followup(&ctx.token, &prompt).await?;

    let response = state
        .confirms
        .wait(confirmation, state.config.confirm_timeout)
        .await;
    if let Some(message) = apply_clear(state, ctx, settings, user, response).await? {
        state.discord.create_followup(&ctx.token, &message).await?;
    }
    Ok(())
}

/// Act on the answer to a clear prompt; `None` means nothing more to say.
pub async fn apply_clear(
    state: &AppState,
    ctx: &CommandContext,
    settings: &ExtensionSettings,
    user: &TargetUser,
    response: ConfirmResponse,
) -> Result<Option<ResponseData>> {
    match response {
        ConfirmResponse::Timeout => Ok(None),
        ConfirmResponse::Denied => Ok(Some(
            ResponseData::embed(deny_embed(&format!("Notes for `{user}` were not cleared")))
                .ephemeral(),
        )),
        ConfirmResponse::Confirmed => {
            let guild_id = ctx.guild_id.to_string();
            for note in notes::get_notes(&state.pool, &user.id.to_string(), &guild_id).await? {
                notes::delete_note(&state.pool, note.id).await?;
            }

            if let Some(role) = note_role(state, ctx.guild_id, settings).await? {
                state
                    .discord
                    .remove_member_role(ctx.guild_id, user.id, role.id)
                    .await?;
                info!(
                    guild = %ctx.guild_id,
                    user = %user.id,
                    role = %role.name,
                    "Notes were cleared by {}",
                    ctx.invoker.name
                );
            }

            Ok(Some(
                ResponseData::embed(confirm_embed(&format!("Notes cleared for `{user}`")))
                    .ephemeral(),
            ))
        }
    }
}

async fn all_notes(
    state: &AppState,
    ctx: CommandContext,
    settings: &ExtensionSettings,
) -> Result<Reply> {
    check_reader(state, &ctx, settings).await?;
    let user = target(&ctx)?;
    let existing =
        notes::get_notes(&state.pool, &user.id.to_string(), &ctx.guild_id.to_string()).await?;
    if existing.is_empty() {
        return Err(Error::Validation(format!("There are no notes for `{user}`")));
    }

    let state = state.clone();
    tokio::spawn(async move {
        let result = async {
            let file = export_notes(&state, ctx.guild_id, &user, &existing).await?;
            state
                .discord
                .create_followup_with_file(&ctx.token, &ResponseData::default().ephemeral(), file)
                .await
        }
        .await;
        if let Err(e) = result {
            error!(guild = %ctx.guild_id, user = %user.id, error = %e, "Sending notes file failed");
            report_failure(&state, &ctx, &e).await;
        }
    });

    Ok(Reply::Deferred { ephemeral: true })
}

#[derive(Debug, Serialize)]
struct NotesFile {
    notes: Vec<NoteEntry>,
}

#[derive(Debug, Serialize)]
struct NoteEntry {
    body: String,
    from: String,
    at: String,
}

/// YAML attachment with every note for `user`, newest first.
pub async fn export_notes(
    state: &AppState,
    guild_id: Id<GuildMarker>,
    user: &TargetUser,
    user_notes: &[notes::UserNote],
) -> Result<FileAttachment> {
    let mut entries = Vec::with_capacity(user_notes.len());
    for note in user_notes {
        entries.push(NoteEntry {
            body: note.body.clone(),
            from: author_name(state, guild_id, &note.author_id).await,
            at: note.updated.to_string(),
        });
    }

    let yaml = serde_yaml::to_string(&NotesFile { notes: entries })
        .map_err(|e| Error::Internal(e.to_string()))?;
    Ok(FileAttachment {
        filename: format!(
            "notes-for-{}-{}.yaml",
            user.id,
            Utc::now().format("%Y-%m-%d %H:%M:%S%.6f")
        ),
        content_type: "application/x-yaml".to_string(),
        bytes: yaml.into_bytes(),
    })
}
