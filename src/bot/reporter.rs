use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{error, warn};

use crate::bot::{flush_open_sessions, Data};
use crate::utils::format::format_auto_report;
use crate::utils::time::current_day_utc;

pub const REPORT_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Spawns the background task that periodically settles open sessions and
/// posts today's totals to every guild with a configured report channel.
pub fn spawn(ctx: serenity::Context, data: Data) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REPORT_INTERVAL);
        // The first tick fires immediately; skip it so reports start one
        // full interval after boot.
        interval.tick().await;
        loop {
            interval.tick().await;
            run_cycle(&ctx, &data).await;
        }
    });
}

async fn run_cycle(ctx: &serenity::Context, data: &Data) {
    flush_open_sessions(data).await;

    let configured = match data.accrual.guilds_with_report_channel().await {
        Ok(configured) => configured,
        Err(e) => {
            error!("failed to read report channel configs: {e:#}");
            return;
        }
    };

    let day = current_day_utc();
    for (guild_id, channel_id) in configured {
        // Failures are isolated per guild; the next cycle retries.
        let totals = match data.accrual.get_day(guild_id, &day).await {
            Ok(totals) => totals,
            Err(e) => {
                error!("failed to read voice totals for guild {guild_id}: {e:#}");
                continue;
            }
        };
        if totals.is_empty() {
            continue;
        }

        if let Err(e) = channel_id.say(&ctx.http, format_auto_report(&totals)).await {
            warn!("failed to deliver voice report to {channel_id} in guild {guild_id}: {e:?}");
        }
    }
}
