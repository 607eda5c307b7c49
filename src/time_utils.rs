// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Stored timestamps are fixed-width RFC3339 UTC strings with millisecond
//! precision, so lexicographic order in Firestore matches time order.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC3339 timestamp into UTC.
pub fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a goal deadline: full RFC3339, or a bare date meaning end of that day.
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Some(dt) = parse_rfc3339(raw) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_fixed_width() {
        let a = format_utc_rfc3339(Utc.with_ymd_and_hms(2026, 1, 5, 3, 4, 5).unwrap());
        assert_eq!(a, "2026-01-05T03:04:05.000Z");
    }

    #[test]
    fn test_parse_deadline_date_only() {
        let dt = parse_deadline("2026-03-01").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap());
        assert!(parse_deadline("next tuesday").is_none());
    }
}
