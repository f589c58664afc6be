//! Display formatting helpers.

use chrono::{DateTime, Utc};

/// Age of `then` relative to `now`, in the largest whole unit.
///
/// Timestamps in the future read as "now".
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 0 {
        return "now".to_string();
    }
    if seconds < 60 {
        return plural(seconds, "second");
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }

    let days = hours / 24;
    if days < 7 {
        return plural(days, "day");
    }

    let weeks = days / 7;
    if weeks < 4 {
        return plural(weeks, "week");
    }

    let months = days / 30;
    if months < 12 {
        return plural(months.max(1), "month");
    }

    plural((days / 365).max(1), "year")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time_units() {
        let now = Utc::now();
        let cases = [
            (Duration::seconds(-30), "now"),
            (Duration::seconds(0), "0 seconds ago"),
            (Duration::seconds(1), "1 second ago"),
            (Duration::seconds(59), "59 seconds ago"),
            (Duration::minutes(1), "1 minute ago"),
            (Duration::minutes(45), "45 minutes ago"),
            (Duration::hours(23), "23 hours ago"),
            (Duration::days(1), "1 day ago"),
            (Duration::days(6), "6 days ago"),
            (Duration::days(7), "1 week ago"),
            (Duration::days(27), "3 weeks ago"),
            (Duration::days(28), "1 month ago"),
            (Duration::days(95), "3 months ago"),
            (Duration::days(365), "1 year ago"),
            (Duration::days(800), "2 years ago"),
        ];
        for (age, expected) in cases {
            assert_eq!(relative_time(now - age, now), expected, "age {:?}", age);
        }
    }
}
