use crate::audio::{JOIN_CUE, LEAVE_CUE};
use crate::bot::{Context, Error};
use crate::utils::format::{format_error_message, format_success_message};

/// Replaces the join/leave cue sounds (bot owner only)
#[poise::command(prefix_command, owners_only)]
pub async fn upload(ctx: Context<'_>) -> Result<(), Error> {
    let poise::Context::Prefix(prefix) = ctx else {
        return Ok(());
    };

    let Some(attachment) = prefix.msg.attachments.first() else {
        ctx.say(format_error_message(
            "Please attach a file named `join.mp3` or `leave.mp3`.",
        ))
        .await?;
        return Ok(());
    };

    let file_name = attachment.filename.clone();
    if file_name != JOIN_CUE && file_name != LEAVE_CUE {
        ctx.say(format_error_message(
            "You can only upload `join.mp3` or `leave.mp3`.",
        ))
        .await?;
        return Ok(());
    }

    let bytes = match attachment.download().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("failed to download {file_name}: {e:?}");
            ctx.say(format_error_message("Failed to save the file."))
                .await?;
            return Ok(());
        }
    };

    let sounds_dir = &ctx.data().config.sounds_dir;
    tokio::fs::create_dir_all(sounds_dir).await?;
    tokio::fs::write(sounds_dir.join(&file_name), &bytes).await?;

    ctx.say(format_success_message(&format!(
        "Successfully replaced `{file_name}`."
    )))
    .await?;

    Ok(())
}
