use poise::serenity_prelude as serenity;
use tracing::error;

use crate::audio::{JOIN_CUE, LEAVE_CUE};
use crate::bot::Data;
use crate::utils::time::{current_day_utc, now_millis};

/// Feeds voice-state changes into the presence tracker and flushes any
/// released time into the accrual store. The tracked user gets audio cues
/// instead of accounting.
pub async fn voice_state_update(
    _ctx: &serenity::Context,
    data: &Data,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
) {
    let Some(guild_id) = new.guild_id else {
        return;
    };
    if new.member.as_ref().is_some_and(|m| m.user.bot) {
        return;
    }

    let user_id = new.user_id;
    let old_channel = old.and_then(|state| state.channel_id);
    let new_channel = new.channel_id;

    if Some(user_id) == data.config.tracked_user_id {
        play_tracked_user_cue(data, guild_id, old_channel, new_channel).await;
        return;
    }

    let result = {
        let mut tracker = data.tracker.lock();
        tracker.on_transition(guild_id, user_id, old_channel, new_channel, now_millis())
    };

    if result.delta_seconds == 0 {
        return;
    }

    // The whole interval lands on the day the transition was observed.
    let day = current_day_utc();
    if let Err(e) = data
        .accrual
        .add_seconds(guild_id, user_id, &day, result.delta_seconds)
        .await
    {
        error!("voice time flush failed: {e:#}");
    }
}

async fn play_tracked_user_cue(
    data: &Data,
    guild_id: serenity::GuildId,
    old_channel: Option<serenity::ChannelId>,
    new_channel: Option<serenity::ChannelId>,
) {
    let cue = match (old_channel, new_channel) {
        (None, Some(channel)) => Some((channel, JOIN_CUE)),
        (Some(channel), None) => Some((channel, LEAVE_CUE)),
        (Some(old), Some(new)) if old != new => Some((new, JOIN_CUE)),
        _ => None,
    };

    if let Some((channel_id, file_name)) = cue {
        if let Err(e) = data.audio.play_cue(guild_id, channel_id, file_name).await {
            error!("failed to play {file_name} cue in guild {guild_id}: {e:#}");
        }
    }
}
