use crate::bot::{Context, Error};
use crate::database::models::{ConfigKind, SnipeEntry};
use crate::utils::format::{format_error_message, format_snipe_line, format_success_message};
use crate::utils::roles::outranks;
use poise::serenity_prelude as serenity;

/// Sets the channel where deleted messages are shown
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setsnipe(
    ctx: Context<'_>,
    channel: Option<serenity::ChannelId>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel_id = channel.unwrap_or_else(|| ctx.channel_id());

    let is_text_channel = {
        let Some(guild) = ctx.guild() else {
            return Ok(());
        };
        guild
            .channels
            .get(&channel_id)
            .is_some_and(|c| c.kind == serenity::ChannelType::Text)
    };
    if !is_text_channel {
        ctx.say(format_error_message("Please mention a valid text channel."))
            .await?;
        return Ok(());
    }

    ctx.data()
        .accrual
        .set_guild_config(guild_id, ConfigKind::SnipeChannel, channel_id)
        .await?;
    ctx.say(format_success_message(&format!(
        "Snipes will now be shown in <#{channel_id}>."
    )))
    .await?;

    Ok(())
}

/// Shows recently deleted messages; only answers in the snipe channel
#[poise::command(prefix_command, guild_only)]
pub async fn snips(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    // Silently ignored outside the configured snipe channel.
    let snipe_channel = ctx
        .data()
        .accrual
        .get_guild_config(guild_id, ConfigKind::SnipeChannel)
        .await?;
    if snipe_channel != Some(ctx.channel_id()) {
        return Ok(());
    }

    let snipes = ctx.data().accrual.get_snipes(guild_id).await?;
    if snipes.is_empty() {
        ctx.say(format_error_message("No deleted messages recorded yet."))
            .await?;
        return Ok(());
    }

    let Some(invoker) = ctx.author_member().await else {
        return Ok(());
    };

    let mut lines = Vec::new();
    for snipe in &snipes {
        if is_visible_to(ctx, &invoker, snipe).await {
            lines.push(format_snipe_line(snipe));
        }
    }

    if lines.is_empty() {
        ctx.say(format_error_message(
            "You don't have permission to view any recent deleted messages.",
        ))
        .await?;
        return Ok(());
    }

    let mut content = lines.join("\n");
    truncate_to_message_limit(&mut content);

    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .allowed_mentions(serenity::CreateAllowedMentions::new()),
    )
    .await?;

    Ok(())
}

/// A snipe is visible to its own author, to anyone who outranks the
/// author, and to everyone once the author has left the guild.
async fn is_visible_to(ctx: Context<'_>, invoker: &serenity::Member, snipe: &SnipeEntry) -> bool {
    if invoker.user.id.to_string() == snipe.author_id {
        return true;
    }

    let Some(author_id) = snipe
        .author_id
        .parse::<u64>()
        .ok()
        .filter(|&id| id != 0)
        .map(serenity::UserId::new)
    else {
        return false;
    };

    let Some(guild_id) = ctx.guild_id() else {
        return false;
    };
    let Ok(author) = guild_id.member(ctx.serenity_context(), author_id).await else {
        return true;
    };

    let Some(guild) = ctx.guild() else {
        return false;
    };
    outranks(&guild, &invoker.roles, &author.roles)
}

// Discord rejects messages over 2000 characters.
fn truncate_to_message_limit(content: &mut String) {
    const LIMIT: usize = 2000;
    if content.len() <= LIMIT {
        return;
    }
    let mut end = LIMIT;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    content.truncate(end);
}
