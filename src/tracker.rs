use std::collections::HashMap;

use poise::serenity_prelude::{ChannelId, GuildId, UserId};

/// How a voice-state change was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Join,
    Leave,
    Move,
    Ignore,
}

/// Result of feeding one voice-state change through the tracker.
/// `delta_seconds` is zero when no time was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionResult {
    pub kind: TransitionKind,
    pub delta_seconds: u64,
}

/// Elapsed time released by `settle_all` for one still-open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettledSession {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub delta_seconds: u64,
}

/// In-memory map of open voice sessions, keyed by (guild, user).
///
/// The tracker is the sole owner of session state and never touches the
/// database; callers route non-zero deltas into the accrual store. Open
/// sessions are lost on restart, losing only the unflushed tail.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    sessions: HashMap<(GuildId, UserId), i64>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Classifies a voice-state change and returns the whole seconds it
    /// released.
    ///
    /// The gateway may redeliver events: a duplicate join overwrites the
    /// start timestamp without emitting a delta, and a leave without an
    /// open session is a zero no-op, so redelivery can never double count.
    /// A move closes the old session and reopens it at `now_ms` in one step.
    pub fn on_transition(
        &mut self,
        guild_id: GuildId,
        user_id: UserId,
        old_channel: Option<ChannelId>,
        new_channel: Option<ChannelId>,
        now_ms: i64,
    ) -> TransitionResult {
        let key = (guild_id, user_id);
        match (old_channel, new_channel) {
            (None, Some(_)) => {
                self.sessions.insert(key, now_ms);
                TransitionResult {
                    kind: TransitionKind::Join,
                    delta_seconds: 0,
                }
            }
            (Some(_), None) => {
                let delta = self
                    .sessions
                    .remove(&key)
                    .map(|start| elapsed_seconds(start, now_ms))
                    .unwrap_or(0);
                TransitionResult {
                    kind: TransitionKind::Leave,
                    delta_seconds: delta,
                }
            }
            (Some(old), Some(new)) if old != new => {
                let delta = self
                    .sessions
                    .insert(key, now_ms)
                    .map(|start| elapsed_seconds(start, now_ms))
                    .unwrap_or(0);
                TransitionResult {
                    kind: TransitionKind::Move,
                    delta_seconds: delta,
                }
            }
            // Same channel on both sides (mute or deafen toggles), or
            // neither side has a channel.
            _ => TransitionResult {
                kind: TransitionKind::Ignore,
                delta_seconds: 0,
            },
        }
    }

    /// Releases elapsed time for every open session without closing any,
    /// resetting each start timestamp to `now_ms`. Sessions that released
    /// nothing are omitted so an immediate second settle reports nothing.
    pub fn settle_all(&mut self, now_ms: i64) -> Vec<SettledSession> {
        let mut settled = Vec::new();
        for (&(guild_id, user_id), start) in self.sessions.iter_mut() {
            let delta = elapsed_seconds(*start, now_ms);
            *start = now_ms;
            if delta > 0 {
                settled.push(SettledSession {
                    guild_id,
                    user_id,
                    delta_seconds: delta,
                });
            }
        }
        settled
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}

// Clamped so a redelivered or skewed event with now < start stays at zero.
fn elapsed_seconds(start_ms: i64, now_ms: i64) -> u64 {
    ((now_ms - start_ms).max(0) / 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GUILD: GuildId = GuildId::new(100);
    const USER: UserId = UserId::new(200);
    const VC1: ChannelId = ChannelId::new(301);
    const VC2: ChannelId = ChannelId::new(302);

    #[test]
    fn join_then_leave_releases_elapsed_seconds() {
        let mut tracker = PresenceTracker::new();

        let join = tracker.on_transition(GUILD, USER, None, Some(VC1), 1_000);
        assert_eq!(join.kind, TransitionKind::Join);
        assert_eq!(join.delta_seconds, 0);

        let leave = tracker.on_transition(GUILD, USER, Some(VC1), None, 8_500);
        assert_eq!(leave.kind, TransitionKind::Leave);
        assert_eq!(leave.delta_seconds, 7);
        assert_eq!(tracker.open_sessions(), 0);
    }

    #[test]
    fn duplicate_join_keeps_newer_timestamp() {
        let mut tracker = PresenceTracker::new();

        tracker.on_transition(GUILD, USER, None, Some(VC1), 1_000);
        let rejoin = tracker.on_transition(GUILD, USER, None, Some(VC1), 5_000);
        assert_eq!(rejoin.delta_seconds, 0);

        // Delta counts from the second join, not the first.
        let leave = tracker.on_transition(GUILD, USER, Some(VC1), None, 9_000);
        assert_eq!(leave.delta_seconds, 4);
    }

    #[test]
    fn duplicate_leave_is_a_zero_noop() {
        let mut tracker = PresenceTracker::new();

        tracker.on_transition(GUILD, USER, None, Some(VC1), 0);
        tracker.on_transition(GUILD, USER, Some(VC1), None, 3_000);

        let again = tracker.on_transition(GUILD, USER, Some(VC1), None, 6_000);
        assert_eq!(again.kind, TransitionKind::Leave);
        assert_eq!(again.delta_seconds, 0);
    }

    #[test]
    fn move_closes_and_reopens_the_session() {
        let mut tracker = PresenceTracker::new();

        tracker.on_transition(GUILD, USER, None, Some(VC1), 0);
        let moved = tracker.on_transition(GUILD, USER, Some(VC1), Some(VC2), 5_000);
        assert_eq!(moved.kind, TransitionKind::Move);
        assert_eq!(moved.delta_seconds, 5);
        assert_eq!(tracker.open_sessions(), 1);

        let leave = tracker.on_transition(GUILD, USER, Some(VC2), None, 12_000);
        assert_eq!(leave.delta_seconds, 7);
    }

    #[test]
    fn move_without_open_session_acts_as_fresh_join() {
        let mut tracker = PresenceTracker::new();

        let moved = tracker.on_transition(GUILD, USER, Some(VC1), Some(VC2), 4_000);
        assert_eq!(moved.kind, TransitionKind::Move);
        assert_eq!(moved.delta_seconds, 0);

        let leave = tracker.on_transition(GUILD, USER, Some(VC2), None, 10_000);
        assert_eq!(leave.delta_seconds, 6);
    }

    #[test]
    fn same_channel_update_is_ignored() {
        let mut tracker = PresenceTracker::new();

        tracker.on_transition(GUILD, USER, None, Some(VC1), 0);
        let toggled = tracker.on_transition(GUILD, USER, Some(VC1), Some(VC1), 5_000);
        assert_eq!(toggled.kind, TransitionKind::Ignore);
        assert_eq!(toggled.delta_seconds, 0);

        // The original join timestamp is untouched.
        let leave = tracker.on_transition(GUILD, USER, Some(VC1), None, 9_000);
        assert_eq!(leave.delta_seconds, 9);
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        let mut tracker = PresenceTracker::new();

        tracker.on_transition(GUILD, USER, None, Some(VC1), 10_000);
        let leave = tracker.on_transition(GUILD, USER, Some(VC1), None, 7_000);
        assert_eq!(leave.delta_seconds, 0);
    }

    #[test]
    fn settle_all_keeps_sessions_open_and_resets_clocks() {
        let mut tracker = PresenceTracker::new();
        let other = UserId::new(201);

        tracker.on_transition(GUILD, USER, None, Some(VC1), 0);
        tracker.on_transition(GUILD, other, None, Some(VC2), 2_000);

        let mut settled = tracker.settle_all(10_000);
        settled.sort_by_key(|s| s.user_id);
        assert_eq!(settled.len(), 2);
        assert_eq!(settled[0].delta_seconds, 10);
        assert_eq!(settled[1].delta_seconds, 8);
        assert_eq!(tracker.open_sessions(), 2);

        // Nothing elapsed since the settle, so nothing is reported.
        assert_eq!(tracker.settle_all(10_000), vec![]);
    }

    #[test]
    fn settle_then_leave_does_not_double_count() {
        let mut tracker = PresenceTracker::new();

        tracker.on_transition(GUILD, USER, None, Some(VC1), 0);
        let settled = tracker.settle_all(6_000);
        assert_eq!(settled[0].delta_seconds, 6);

        // Only the seconds after the settle are released again.
        let leave = tracker.on_transition(GUILD, USER, Some(VC1), None, 9_000);
        assert_eq!(leave.delta_seconds, 3);
    }

    #[test]
    fn join_move_leave_scenario_accrues_twelve_seconds() {
        let mut tracker = PresenceTracker::new();
        let mut total = 0;

        let join = tracker.on_transition(GUILD, USER, None, Some(VC1), 0);
        assert_eq!((join.kind, join.delta_seconds), (TransitionKind::Join, 0));
        total += join.delta_seconds;

        let moved = tracker.on_transition(GUILD, USER, Some(VC1), Some(VC2), 5_000);
        assert_eq!((moved.kind, moved.delta_seconds), (TransitionKind::Move, 5));
        total += moved.delta_seconds;

        let leave = tracker.on_transition(GUILD, USER, Some(VC2), None, 12_000);
        assert_eq!((leave.kind, leave.delta_seconds), (TransitionKind::Leave, 7));
        total += leave.delta_seconds;

        assert_eq!(total, 12);
    }
}
