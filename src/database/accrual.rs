use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use tokio::sync::Mutex;

use crate::database::kv::KvStore;
use crate::database::models::{ConfigKind, SnipeEntry, VoiceTotal};

/// Oldest snipes beyond this are dropped.
pub const SNIPE_LIMIT: usize = 50;

/// Durable accumulator keyed by (guild, user, day), plus the per-guild
/// channel settings and the snipe log, all layered over the KV store.
///
/// The KV store has no atomic increment, so `add_seconds` serializes its
/// read-modify-write merge per accrual key; concurrent merges for the same
/// key sum instead of overwriting each other.
#[derive(Clone)]
pub struct AccrualStore {
    kv: KvStore,
    merge_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl AccrualStore {
    pub fn new(kv: KvStore) -> Self {
        Self {
            kv,
            merge_locks: Arc::new(DashMap::new()),
        }
    }

    fn accrual_key(guild_id: GuildId, user_id: UserId, day: &str) -> String {
        format!("voiceTime_{guild_id}_{user_id}_{day}")
    }

    /// Merges `delta_seconds` into the stored total for (guild, user, day).
    ///
    /// The returned error carries guild, user, day and amount so a failed
    /// delta can be replayed by hand from the logs.
    pub async fn add_seconds(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        day: &str,
        delta_seconds: u64,
    ) -> Result<()> {
        if delta_seconds == 0 {
            return Ok(());
        }

        let key = Self::accrual_key(guild_id, user_id, day);
        let lock = self
            .merge_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let current: u64 = self.kv.get(&key).await?.unwrap_or(0);
        self.kv
            .set(&key, &(current + delta_seconds))
            .await
            .with_context(|| {
                format!(
                    "failed to persist {delta_seconds}s for user {user_id} in guild {guild_id} on {day}"
                )
            })
    }

    /// Every user's recorded total for the given guild and day, in
    /// insertion order. An unrecorded day yields an empty vec.
    pub async fn get_day(&self, guild_id: GuildId, day: &str) -> Result<Vec<VoiceTotal>> {
        let prefix = format!("voiceTime_{guild_id}_");
        let suffix = format!("_{day}");

        let mut totals = Vec::new();
        for (key, value) in self.kv.all().await? {
            if !key.starts_with(&prefix) || !key.ends_with(&suffix) {
                continue;
            }
            let user_id = &key[prefix.len()..key.len() - suffix.len()];
            if user_id.is_empty() || user_id.contains('_') {
                continue;
            }
            totals.push(VoiceTotal {
                user_id: user_id.to_string(),
                total_seconds: serde_json::from_str(&value).unwrap_or(0),
            });
        }
        Ok(totals)
    }

    pub async fn set_guild_config(
        &self,
        guild_id: GuildId,
        kind: ConfigKind,
        channel_id: ChannelId,
    ) -> Result<()> {
        self.kv
            .set(&kind.key(guild_id), &channel_id.to_string())
            .await
    }

    pub async fn get_guild_config(
        &self,
        guild_id: GuildId,
        kind: ConfigKind,
    ) -> Result<Option<ChannelId>> {
        let raw: Option<String> = self.kv.get(&kind.key(guild_id)).await?;
        Ok(raw.and_then(parse_channel_id))
    }

    /// Every guild with a configured voice report channel.
    pub async fn guilds_with_report_channel(&self) -> Result<Vec<(GuildId, ChannelId)>> {
        let mut configured = Vec::new();
        for (key, value) in self.kv.all().await? {
            let Some(raw_guild) = key.strip_prefix("voiceLogChannelId_") else {
                continue;
            };
            let Some(guild_id) = raw_guild
                .parse::<u64>()
                .ok()
                .filter(|&id| id != 0)
                .map(GuildId::new)
            else {
                continue;
            };
            let Some(channel_id) = serde_json::from_str::<String>(&value)
                .ok()
                .and_then(parse_channel_id)
            else {
                continue;
            };
            configured.push((guild_id, channel_id));
        }
        Ok(configured)
    }

    /// Prepends a deleted message to the guild's snipe log, dropping the
    /// oldest entries beyond `SNIPE_LIMIT`.
    pub async fn push_snipe(&self, guild_id: GuildId, entry: SnipeEntry) -> Result<()> {
        let key = format!("snipe_{guild_id}");
        let mut snipes: Vec<SnipeEntry> = self.kv.get(&key).await?.unwrap_or_default();
        snipes.insert(0, entry);
        snipes.truncate(SNIPE_LIMIT);
        self.kv.set(&key, &snipes).await
    }

    pub async fn get_snipes(&self, guild_id: GuildId) -> Result<Vec<SnipeEntry>> {
        Ok(self
            .kv
            .get(&format!("snipe_{guild_id}"))
            .await?
            .unwrap_or_default())
    }
}

fn parse_channel_id(raw: String) -> Option<ChannelId> {
    raw.parse::<u64>()
        .ok()
        .filter(|&id| id != 0)
        .map(ChannelId::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations;
    use pretty_assertions::assert_eq;
    use sqlx::sqlite::SqlitePoolOptions;

    const GUILD: GuildId = GuildId::new(100);
    const OTHER_GUILD: GuildId = GuildId::new(101);
    const USER: UserId = UserId::new(200);
    const OTHER_USER: UserId = UserId::new(201);
    const CHANNEL: ChannelId = ChannelId::new(300);

    async fn store() -> AccrualStore {
        // A single connection keeps every query on the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        AccrualStore::new(KvStore::new(pool))
    }

    #[tokio::test]
    async fn add_seconds_merges_into_existing_total() {
        let store = store().await;

        store.add_seconds(GUILD, USER, "2024-01-01", 30).await.unwrap();
        store.add_seconds(GUILD, USER, "2024-01-01", 12).await.unwrap();

        let totals = store.get_day(GUILD, "2024-01-01").await.unwrap();
        assert_eq!(
            totals,
            vec![VoiceTotal {
                user_id: USER.to_string(),
                total_seconds: 42,
            }]
        );
    }

    #[tokio::test]
    async fn zero_delta_writes_nothing() {
        let store = store().await;

        store.add_seconds(GUILD, USER, "2024-01-01", 0).await.unwrap();

        assert_eq!(store.get_day(GUILD, "2024-01-01").await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn get_day_filters_by_guild_and_day() {
        let store = store().await;

        store.add_seconds(GUILD, USER, "2024-01-01", 10).await.unwrap();
        store.add_seconds(GUILD, OTHER_USER, "2024-01-01", 20).await.unwrap();
        store.add_seconds(GUILD, USER, "2024-01-02", 99).await.unwrap();
        store.add_seconds(OTHER_GUILD, USER, "2024-01-01", 7).await.unwrap();

        let totals = store.get_day(GUILD, "2024-01-01").await.unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].user_id, USER.to_string());
        assert_eq!(totals[0].total_seconds, 10);
        assert_eq!(totals[1].user_id, OTHER_USER.to_string());
        assert_eq!(totals[1].total_seconds, 20);
    }

    #[tokio::test]
    async fn get_day_on_quiet_guild_returns_empty() {
        let store = store().await;

        assert_eq!(store.get_day(GUILD, "2024-01-01").await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn concurrent_merges_for_one_key_all_land() {
        let store = store().await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add_seconds(GUILD, USER, "2024-01-01", 5).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let totals = store.get_day(GUILD, "2024-01-01").await.unwrap();
        assert_eq!(totals[0].total_seconds, 50);
    }

    #[tokio::test]
    async fn guild_config_round_trips_per_kind() {
        let store = store().await;

        assert_eq!(
            store
                .get_guild_config(GUILD, ConfigKind::VoiceReport)
                .await
                .unwrap(),
            None
        );

        store
            .set_guild_config(GUILD, ConfigKind::VoiceReport, CHANNEL)
            .await
            .unwrap();

        assert_eq!(
            store
                .get_guild_config(GUILD, ConfigKind::VoiceReport)
                .await
                .unwrap(),
            Some(CHANNEL)
        );
        // The other kind stays untouched.
        assert_eq!(
            store
                .get_guild_config(GUILD, ConfigKind::SnipeChannel)
                .await
                .unwrap(),
            None
        );

        assert_eq!(
            store.guilds_with_report_channel().await.unwrap(),
            vec![(GUILD, CHANNEL)]
        );
    }

    #[tokio::test]
    async fn snipe_log_is_newest_first_and_bounded() {
        let store = store().await;

        for i in 0..(SNIPE_LIMIT + 5) {
            store
                .push_snipe(
                    GUILD,
                    SnipeEntry {
                        content: format!("message {i}"),
                        author: "author".to_string(),
                        author_id: USER.to_string(),
                        timestamp_ms: i as i64,
                    },
                )
                .await
                .unwrap();
        }

        let snipes = store.get_snipes(GUILD).await.unwrap();
        assert_eq!(snipes.len(), SNIPE_LIMIT);
        assert_eq!(snipes[0].content, format!("message {}", SNIPE_LIMIT + 4));
        assert_eq!(snipes[SNIPE_LIMIT - 1].content, "message 5");
    }
}
