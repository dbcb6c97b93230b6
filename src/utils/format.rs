use crate::database::models::{SnipeEntry, VoiceTotal};

/// Renders whole seconds in the `Xh Ym Zs` style used by every report.
pub fn format_duration_seconds(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

fn format_total_lines(totals: &[VoiceTotal]) -> String {
    totals
        .iter()
        .map(|total| {
            format!(
                "<@{}> — **{}**",
                total.user_id,
                format_duration_seconds(total.total_seconds)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_day_report(day: &str, totals: &[VoiceTotal]) -> String {
    if totals.is_empty() {
        return format!("📭 No voice activity recorded for **{day}**.");
    }
    format!(
        "📊 **Voice Time for {day}**:\n\n{}",
        format_total_lines(totals)
    )
}

pub fn format_auto_report(totals: &[VoiceTotal]) -> String {
    format!(
        "⏱️ **[Auto Report] Voice Time So Far Today**:\n\n{}",
        format_total_lines(totals)
    )
}

pub fn format_snipe_line(entry: &SnipeEntry) -> String {
    let content = if entry.content.is_empty() {
        "Empty Message"
    } else {
        entry.content.as_str()
    };
    format!(
        "**{}** ({}) — <t:{}:R>\n```{}```",
        entry.author,
        entry.author_id,
        entry.timestamp_ms / 1000,
        content
    )
}

pub fn format_error_message(message: &str) -> String {
    format!("❌ {message}")
}

pub fn format_success_message(message: &str) -> String {
    format!("✅ {message}")
}
