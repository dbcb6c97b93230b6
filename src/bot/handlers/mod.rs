pub mod messages;
pub mod voice;

use crate::bot::{Data, Error};
use poise::serenity_prelude as serenity;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Bot logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            voice::voice_state_update(ctx, data, old.as_ref(), new).await;
        }
        serenity::FullEvent::Message { new_message } => {
            messages::message(ctx, data, new_message).await;
        }
        serenity::FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => {
            messages::message_delete(ctx, data, *channel_id, *deleted_message_id, *guild_id).await;
        }
        _ => {}
    }
    Ok(())
}
