use chrono::{Days, NaiveDate, Utc};

/// Accrual records are bucketed by UTC calendar date, `YYYY-MM-DD`.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn current_day_utc() -> String {
    day_key(Utc::now().date_naive())
}

pub fn previous_day_utc() -> String {
    let today = Utc::now().date_naive();
    day_key(today.checked_sub_days(Days::new(1)).unwrap_or(today))
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Resolves a report date argument to a day key. Missing or `today` means
/// today, `yesterday` the day before, and an explicit `YYYY-MM-DD` date is
/// taken as given. Anything else is rejected with `None`.
pub fn resolve_day_arg(arg: Option<&str>) -> Option<String> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        None | Some("today") => Some(current_day_utc()),
        Some("yesterday") => Some(previous_day_utc()),
        Some(explicit) => NaiveDate::parse_from_str(explicit, "%Y-%m-%d")
            .ok()
            .map(day_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn day_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(day_key(date), "2024-03-07");
    }

    #[test]
    fn resolve_day_arg_accepts_named_days() {
        assert_eq!(resolve_day_arg(None), Some(current_day_utc()));
        assert_eq!(resolve_day_arg(Some("today")), Some(current_day_utc()));
        assert_eq!(resolve_day_arg(Some("TODAY")), Some(current_day_utc()));
        assert_eq!(resolve_day_arg(Some("yesterday")), Some(previous_day_utc()));
    }

    #[test]
    fn resolve_day_arg_accepts_explicit_dates() {
        assert_eq!(
            resolve_day_arg(Some("2024-01-31")),
            Some("2024-01-31".to_string())
        );
    }

    #[test]
    fn resolve_day_arg_rejects_garbage() {
        assert_eq!(resolve_day_arg(Some("tomorrow")), None);
        assert_eq!(resolve_day_arg(Some("2024-13-01")), None);
        assert_eq!(resolve_day_arg(Some("31/01/2024")), None);
    }
}
