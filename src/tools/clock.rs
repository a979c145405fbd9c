use chrono::{prelude::*, Duration};

pub static SECONDS_IN_DAY: i64 = 86400;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Unix timestamp in milliseconds, the format every record stores.
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}

pub fn days_ago_millis(days: i64) -> i64 {
    (now() - Duration::seconds(days * SECONDS_IN_DAY)).timestamp_millis()
}

pub trait Clock {
    fn print(&self) -> Option<String>;
}

impl Clock for i64 {
    fn print(&self) -> Option<String> {
        DateTime::<Utc>::from_timestamp_millis(*self).map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print() {
        assert_eq!(0i64.print(), Some("1970-01-01T00:00:00.000Z".to_string()));
        assert_eq!(1_700_000_000_123i64.print(), Some("2023-11-14T22:13:20.123Z".to_string()));
    }

    #[test]
    fn test_days_ago() {
        let week = days_ago_millis(7);
        let diff = now_millis() - week;
        assert!(diff >= 7 * SECONDS_IN_DAY * 1000);
        assert!(diff < 7 * SECONDS_IN_DAY * 1000 + 5000);
    }
}
