use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};
use tracing::{debug, warn};

use crate::discord::confirm::{AnswerOutcome, ConfirmRegistry, ConfirmResponse};
use crate::discord::context::CommandContext;
use crate::discord::embeds::deny_embed;
use crate::discord::interaction::{
    Interaction, InteractionResponse, Reply, ResponseData, APPLICATION_COMMAND,
    MESSAGE_COMPONENT, PING,
};
use crate::discord::paginate::{PageTurn, Paginator};
use crate::discord::verify::verify_discord_signature;
use crate::error::{Error, Result};
use crate::storage::guild_config;
use crate::AppState;

pub async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get("x-signature-ed25519")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidSignature)?;
    let timestamp = headers
        .get("x-signature-timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidSignature)?;

    if !verify_discord_signature(
        &state.config.discord_public_key,
        timestamp,
        &body,
        signature,
    ) {
        warn!("invalid discord signature");
        return Err(Error::InvalidSignature);
    }

    let interaction: Interaction =
        serde_json::from_slice(&body).map_err(|e| Error::InvalidPayload(e.to_string()))?;

    let response = match interaction.kind {
        PING => InteractionResponse::pong(),
        APPLICATION_COMMAND => do_command(&state, &interaction).await?.into_response(),
        MESSAGE_COMPONENT => do_component(&state, &interaction).await?.into_response(),
        other => {
            debug!(kind = other, "Ignoring interaction type");
            Reply::Acknowledge.into_response()
        }
    };

    Ok(Json(response))
}

/// Build the command context and hand it to the owning plugin.
pub async fn do_command(state: &AppState, interaction: &Interaction) -> Result<Reply> {
    let guild_id = interaction
        .guild_id
        .as_deref()
        .ok_or_else(|| Error::InvalidPayload("missing guild_id".into()))?;
    let config = guild_config::get_config(&state.pool, guild_id).await?;
    let ctx = CommandContext::from_interaction(interaction, config)?;

    Ok(state.plugins.dispatch(state, ctx).await)
}

/// Route a button click to its confirmation prompt or paginator.
pub async fn do_component(state: &AppState, interaction: &Interaction) -> Result<Reply> {
    let custom_id = interaction
        .data
        .as_ref()
        .and_then(|d| d.custom_id.as_deref())
        .ok_or_else(|| Error::InvalidPayload("missing custom_id".into()))?;
    let user_id = interaction
        .member
        .as_ref()
        .and_then(|m| m.user.id.parse().ok())
        .and_then(twilight_model::id::Id::new_checked)
        .ok_or_else(|| Error::InvalidPayload("missing member".into()))?;

    if ConfirmRegistry::is_confirm_id(custom_id) {
        return Ok(match state.confirms.answer(custom_id, user_id) {
            AnswerOutcome::Answered(answer) => {
                let prompt = interaction
                    .message
                    .as_ref()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                let verdict = match answer {
                    ConfirmResponse::Confirmed => "Confirmed",
                    ConfirmResponse::Denied | ConfirmResponse::Timeout => "Cancelled",
                };
                Reply::Update(
                    ResponseData::content(format!("{prompt}\n*{verdict}*")).with_components(vec![]),
                )
            }
            AnswerOutcome::NotAuthor => denied("Only the person who ran the command can answer"),
            AnswerOutcome::Expired => denied("This prompt has expired"),
        });
    }

    if Paginator::is_page_id(custom_id) {
        return Ok(match state.paginator.turn(custom_id, user_id).await {
            PageTurn::Page(page) => Reply::Update(page),
            PageTurn::NotOwner => denied("Only the person who ran the command can turn pages"),
            PageTurn::Expired => denied("These pages have expired"),
        });
    }

    debug!(custom_id, "Unhandled component");
    Ok(Reply::Acknowledge)
}

fn denied(message: &str) -> Reply {
    Reply::Message(ResponseData::embed(deny_embed(message)).ephemeral())
}
