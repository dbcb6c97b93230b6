use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};

/// More than this many messages inside the window is a flood.
pub const FLOOD_MAX_MESSAGES: usize = 5;
pub const FLOOD_WINDOW_MS: i64 = 5_000;
pub const FLOOD_TIMEOUT_SECS: i64 = 60;

/// Sliding-window message counter per (guild, user).
///
/// Explicitly owned state, constructed once and shared through the bot
/// data; a fresh guard per test keeps the window logic testable.
#[derive(Default)]
pub struct FloodGuard {
    recent: DashMap<(GuildId, UserId), Vec<i64>>,
}

impl FloodGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one message and reports whether the user just crossed the
    /// flood threshold. A triggered user's window is cleared so the next
    /// message starts over instead of re-triggering.
    pub fn register(&self, guild_id: GuildId, user_id: UserId, now_ms: i64) -> bool {
        let mut timestamps = self.recent.entry((guild_id, user_id)).or_default();
        timestamps.retain(|&sent| now_ms - sent < FLOOD_WINDOW_MS);
        timestamps.push(now_ms);

        let flooded = timestamps.len() > FLOOD_MAX_MESSAGES;
        if flooded {
            timestamps.clear();
        }
        flooded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId::new(100);
    const USER: UserId = UserId::new(200);

    #[test]
    fn burst_at_the_limit_does_not_trigger() {
        let guard = FloodGuard::new();
        for i in 0..FLOOD_MAX_MESSAGES {
            assert!(!guard.register(GUILD, USER, i as i64 * 100));
        }
    }

    #[test]
    fn one_over_the_limit_triggers() {
        let guard = FloodGuard::new();
        for i in 0..FLOOD_MAX_MESSAGES {
            guard.register(GUILD, USER, i as i64 * 100);
        }
        assert!(guard.register(GUILD, USER, 500));
    }

    #[test]
    fn slow_messages_never_trigger() {
        let guard = FloodGuard::new();
        for i in 0..20 {
            assert!(!guard.register(GUILD, USER, i * FLOOD_WINDOW_MS));
        }
    }

    #[test]
    fn trigger_resets_the_window() {
        let guard = FloodGuard::new();
        for i in 0..=FLOOD_MAX_MESSAGES {
            guard.register(GUILD, USER, i as i64);
        }
        // The burst above triggered; the very next message is counted fresh.
        assert!(!guard.register(GUILD, USER, 10));
    }

    #[test]
    fn users_are_counted_independently() {
        let guard = FloodGuard::new();
        let other = UserId::new(201);
        for i in 0..FLOOD_MAX_MESSAGES {
            guard.register(GUILD, USER, i as i64);
            guard.register(GUILD, other, i as i64);
        }
        assert!(guard.register(GUILD, USER, 6));
        assert!(guard.register(GUILD, other, 6));
    }
}
