use crate::bot::{flush_open_sessions, Context, Error};
use crate::database::models::ConfigKind;
use crate::utils::format::{format_day_report, format_error_message, format_success_message};
use crate::utils::roles::outranks;
use crate::utils::time::resolve_day_arg;
use poise::serenity_prelude as serenity;

/// Shows accumulated voice time per user for a day
#[poise::command(prefix_command, guild_only, subcommands("channel"))]
pub async fn voicetime(ctx: Context<'_>, date: Option<String>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let Some(day) = resolve_day_arg(date.as_deref()) else {
        ctx.say(format_error_message(
            "Invalid date format. Use `today`, `yesterday` or `YYYY-MM-DD`.",
        ))
        .await?;
        return Ok(());
    };

    flush_open_sessions(ctx.data()).await;

    let totals = ctx.data().accrual.get_day(guild_id, &day).await?;
    ctx.say(format_day_report(&day, &totals)).await?;

    Ok(())
}

/// Sets the channel that receives the periodic voice time reports
#[poise::command(prefix_command, guild_only)]
pub async fn channel(ctx: Context<'_>, channel_id: String) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    if !invoker_outranks_bot(ctx).await? {
        ctx.say(format_error_message(
            "You must have a higher role than the bot to set the voice log channel.",
        ))
        .await?;
        return Ok(());
    }

    let channel = match valid_text_channel(ctx, &channel_id) {
        Some(channel) => channel,
        None => {
            ctx.say(format_error_message(
                "Invalid channel ID or not a text channel.",
            ))
            .await?;
            return Ok(());
        }
    };

    ctx.data()
        .accrual
        .set_guild_config(guild_id, ConfigKind::VoiceReport, channel)
        .await?;
    ctx.say(format_success_message(&format!(
        "Voice log channel set to <#{channel}>."
    )))
    .await?;

    Ok(())
}

async fn invoker_outranks_bot(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(false);
    };
    let bot_member = guild_id
        .member(ctx.serenity_context(), ctx.framework().bot_id)
        .await?;
    let Some(invoker) = ctx.author_member().await else {
        return Ok(false);
    };

    let Some(guild) = ctx.guild() else {
        return Ok(false);
    };
    Ok(outranks(&guild, &invoker.roles, &bot_member.roles))
}

fn valid_text_channel(ctx: Context<'_>, raw: &str) -> Option<serenity::ChannelId> {
    let channel_id = raw
        .parse::<u64>()
        .ok()
        .filter(|&id| id != 0)
        .map(serenity::ChannelId::new)?;

    let guild = ctx.guild()?;
    let channel = guild.channels.get(&channel_id)?;
    if channel.kind == serenity::ChannelType::Text {
        Some(channel_id)
    } else {
        None
    }
}
