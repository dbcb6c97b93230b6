use crate::bot::{Context, Error};
use crate::utils::format::format_error_message;

/// Streams audio from a link into your voice channel
#[poise::command(prefix_command, guild_only)]
pub async fn play(ctx: Context<'_>, url: Option<String>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let Some(url) = url.filter(|u| u.starts_with("http")) else {
        ctx.say(format_error_message("Please provide a valid link."))
            .await?;
        return Ok(());
    };

    let channel_id = {
        let Some(guild) = ctx.guild() else {
            return Ok(());
        };
        guild
            .voice_states
            .get(&ctx.author().id)
            .and_then(|state| state.channel_id)
    };
    let Some(channel_id) = channel_id else {
        ctx.say(format_error_message(
            "You must be in a voice channel to play music.",
        ))
        .await?;
        return Ok(());
    };

    match ctx.data().audio.stream_url(guild_id, channel_id, &url).await {
        Ok(()) => {
            ctx.say(format!("▶️ Now playing: {url}")).await?;
        }
        Err(e) => {
            tracing::error!("failed to stream {url} in guild {guild_id}: {e:#}");
            ctx.say(format_error_message(
                "Failed to play the link. Please try again.",
            ))
            .await?;
        }
    }

    Ok(())
}
