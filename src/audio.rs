use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashSet;
use poise::serenity_prelude::{async_trait, ChannelId, GuildId};
use songbird::input::{File, YoutubeDl};
use songbird::{Event, EventContext, EventHandler, Songbird, TrackEvent};
use tracing::warn;

pub const JOIN_CUE: &str = "join.mp3";
pub const LEAVE_CUE: &str = "leave.mp3";

/// How long a cue connection may linger before it is torn down even if the
/// track never reports an end.
const CUE_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Owns the voice connections: short presence cues and URL streaming.
///
/// A guild streaming music is marked busy so cue playback stays out of its
/// channel until the stream finishes.
pub struct AudioPlayer {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    sounds_dir: PathBuf,
    streaming: DashSet<GuildId>,
}

impl AudioPlayer {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client, sounds_dir: PathBuf) -> Self {
        Self {
            manager,
            http,
            sounds_dir,
            streaming: DashSet::new(),
        }
    }

    pub fn is_streaming(&self, guild_id: GuildId) -> bool {
        self.streaming.contains(&guild_id)
    }

    /// Joins the channel and plays a short cue file, leaving again when the
    /// track ends or the idle timeout fires. Skipped while the guild
    /// streams music, and when the cue file has not been uploaded yet.
    pub async fn play_cue(
        self: &Arc<Self>,
        guild_id: GuildId,
        channel_id: ChannelId,
        file_name: &str,
    ) -> Result<()> {
        if self.is_streaming(guild_id) {
            return Ok(());
        }

        let path = self.sounds_dir.join(file_name);
        if !path.exists() {
            warn!("cue file {} is missing, skipping playback", path.display());
            return Ok(());
        }

        let call = self.manager.join(guild_id, channel_id).await.with_context(|| {
            format!("failed to join voice channel {channel_id} in guild {guild_id}")
        })?;

        {
            let mut handler = call.lock().await;
            let track = handler.play_only_input(File::new(path).into());
            let _ = track.add_event(
                Event::Track(TrackEvent::End),
                DisconnectOnEnd {
                    player: Arc::clone(self),
                    guild_id,
                },
            );
        }

        // Fallback teardown if the track end event never arrives.
        let player = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(CUE_IDLE_TIMEOUT).await;
            if !player.is_streaming(guild_id) {
                player.leave(guild_id).await;
            }
        });

        Ok(())
    }

    /// Streams audio from a URL into the channel, holding the guild busy so
    /// presence cues stay quiet until the track finishes or errors out.
    pub async fn stream_url(
        self: &Arc<Self>,
        guild_id: GuildId,
        channel_id: ChannelId,
        url: &str,
    ) -> Result<()> {
        let call = self.manager.join(guild_id, channel_id).await.with_context(|| {
            format!("failed to join voice channel {channel_id} in guild {guild_id}")
        })?;

        self.streaming.insert(guild_id);

        let mut handler = call.lock().await;
        let track = handler.play_only_input(YoutubeDl::new(self.http.clone(), url.to_string()).into());
        for event in [TrackEvent::End, TrackEvent::Error] {
            let _ = track.add_event(
                Event::Track(event),
                DisconnectOnEnd {
                    player: Arc::clone(self),
                    guild_id,
                },
            );
        }

        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) {
        if self.manager.get(guild_id).is_some() {
            if let Err(e) = self.manager.remove(guild_id).await {
                warn!("failed to leave voice channel in guild {guild_id}: {e:?}");
            }
        }
    }
}

struct DisconnectOnEnd {
    player: Arc<AudioPlayer>,
    guild_id: GuildId,
}

#[async_trait]
impl EventHandler for DisconnectOnEnd {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        self.player.streaming.remove(&self.guild_id);
        self.player.leave(self.guild_id).await;
        None
    }
}
