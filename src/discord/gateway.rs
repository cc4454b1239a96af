//! Gateway connection used only for member-join events.

use tracing::{error, info, warn};
use twilight_gateway::{Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};

use crate::AppState;

pub async fn run_member_listener(state: AppState) {
    let mut shard = Shard::new(
        ShardId::ONE,
        state.config.discord_bot_token.clone(),
        Intents::GUILD_MEMBERS,
    );
    info!("Gateway listener started");

    while let Some(item) = shard.next_event(EventTypeFlags::MEMBER_ADD).await {
        let event = match item {
            Ok(event) => event,
            Err(source) => {
                warn!(?source, "error receiving gateway event");
                continue;
            }
        };

        if let Event::MemberAdd(added) = event {
            let state = state.clone();
            tokio::spawn(async move {
                let guild_id = added.guild_id;
                let user_id = added.member.user.id;
                if let Err(e) = state.plugins.member_join(&state, guild_id, user_id).await {
                    error!(%guild_id, %user_id, error = %e, "Member join handling failed");
                }
            });
        }
    }

    warn!("Gateway listener stopped");
}
