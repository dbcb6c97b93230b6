use poise::serenity_prelude::GuildId;
use serde::{Deserialize, Serialize};

/// One user's accumulated voice time for a day, as returned by
/// `AccrualStore::get_day`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTotal {
    pub user_id: String,
    pub total_seconds: u64,
}

/// A deleted message captured for later review in the snipe channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnipeEntry {
    pub content: String,
    pub author: String,
    pub author_id: String,
    pub timestamp_ms: i64,
}

/// Which per-guild channel setting a config operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    VoiceReport,
    SnipeChannel,
}

impl ConfigKind {
    pub fn key(self, guild_id: GuildId) -> String {
        match self {
            ConfigKind::VoiceReport => format!("voiceLogChannelId_{guild_id}"),
            ConfigKind::SnipeChannel => format!("snipeChannel_{guild_id}"),
        }
    }
}
