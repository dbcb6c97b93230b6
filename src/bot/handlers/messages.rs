use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::bot::Data;
use crate::database::models::SnipeEntry;
use crate::utils::flood::FLOOD_TIMEOUT_SECS;
use crate::utils::time::now_millis;

/// Times out members who flood the chat.
pub async fn message(ctx: &serenity::Context, data: &Data, message: &serenity::Message) {
    if message.author.bot {
        return;
    }
    let Some(guild_id) = message.guild_id else {
        return;
    };

    if !data.flood.register(guild_id, message.author.id, now_millis()) {
        return;
    }

    let until = chrono::Utc::now() + chrono::Duration::seconds(FLOOD_TIMEOUT_SECS);
    let Ok(until) = serenity::Timestamp::from_unix_timestamp(until.timestamp()) else {
        return;
    };

    let edit = serenity::EditMember::new().disable_communication_until(until.to_string());
    match guild_id.edit_member(&ctx.http, message.author.id, edit).await {
        Ok(_) => info!(
            "timed out {} in guild {guild_id} for message flooding",
            message.author.id
        ),
        Err(e) => warn!(
            "failed to time out {} in guild {guild_id}: {e:?}",
            message.author.id
        ),
    }
}

/// Records deleted messages in the guild's snipe log. Only messages still
/// in the gateway cache can be recovered.
pub async fn message_delete(
    ctx: &serenity::Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    deleted_message_id: serenity::MessageId,
    guild_id: Option<serenity::GuildId>,
) {
    let Some(guild_id) = guild_id else {
        return;
    };

    let Some(message) = ctx
        .cache
        .message(channel_id, deleted_message_id)
        .map(|cached| cached.clone())
    else {
        return;
    };
    if message.author.bot {
        return;
    }

    let entry = SnipeEntry {
        content: message.content.to_string(),
        author: message.author.name.to_string(),
        author_id: message.author.id.to_string(),
        timestamp_ms: message.timestamp.unix_timestamp() * 1000,
    };

    if let Err(e) = data.accrual.push_snipe(guild_id, entry).await {
        error!("failed to record deleted message in guild {guild_id}: {e:#}");
    }
}
