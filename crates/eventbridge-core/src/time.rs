//! Time conversion between local wall clock and provider timestamps.
//!
//! Local events carry naive wall-clock timestamps. Providers speak RFC 3339,
//! epoch milliseconds, or strings with a fixed offset suffix. Every conversion
//! goes through an explicit [`FixedOffset`] taken from the calendar link, so
//! nothing here depends on the host timezone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing time configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    /// The offset string is not of the form `+HH:MM` / `-HH:MM`.
    #[error("invalid UTC offset `{0}`, expected +HH:MM or -HH:MM")]
    InvalidOffset(String),
}

/// Parses an offset such as `-05:00`, `+0530` or `Z`.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, TimeError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| TimeError::InvalidOffset(value.into()));
    }

    let invalid = || TimeError::InvalidOffset(value.to_string());
    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Renders an offset as `+HH:MM`.
pub fn format_offset(offset: &FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    format!("{}{:02}:{:02}", sign, seconds / 3600, (seconds % 3600) / 60)
}

/// Interprets a naive wall-clock value in `offset` and returns the UTC instant.
///
/// `None` when shifting by the offset leaves the representable range.
pub fn wall_clock_to_utc(naive: NaiveDateTime, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    naive
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .map(|shifted| Utc.from_utc_datetime(&shifted))
}

/// Converts a UTC instant into the naive wall clock of `offset`.
pub fn utc_to_wall_clock(instant: DateTime<Utc>, offset: &FixedOffset) -> Option<NaiveDateTime> {
    instant
        .naive_utc()
        .checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
}

/// Epoch milliseconds for a wall-clock value.
pub fn epoch_millis(naive: NaiveDateTime, offset: &FixedOffset) -> Option<i64> {
    wall_clock_to_utc(naive, offset).map(|utc| utc.timestamp_millis())
}

/// Formats a wall-clock value with the offset appended, e.g. `2024-03-01T09:00:00-05:00`.
pub fn format_with_offset(naive: NaiveDateTime, offset: &FixedOffset) -> String {
    format!(
        "{}{}",
        naive.format("%Y-%m-%dT%H:%M:%S"),
        format_offset(offset)
    )
}

/// Formats a wall-clock value as a UTC `Z` timestamp.
pub fn format_zulu(naive: NaiveDateTime, offset: &FixedOffset) -> Option<String> {
    wall_clock_to_utc(naive, offset).map(|utc| utc.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Parses a remote timestamp string into local wall clock.
///
/// Accepts RFC 3339 (including the `Z` suffix and fractional seconds), naive
/// ISO-8601 with either `T` or a space separator, and strings of digits that
/// hold epoch milliseconds.
pub fn parse_remote_timestamp(value: &str, offset: &FixedOffset) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return utc_to_wall_clock(dt.with_timezone(&Utc), offset);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive);
        }
    }

    if value.chars().all(|c| c.is_ascii_digit()) {
        return value
            .parse::<i64>()
            .ok()
            .and_then(|ms| millis_to_wall_clock(ms, offset));
    }

    None
}

/// Converts epoch milliseconds into local wall clock.
pub fn millis_to_wall_clock(ms: i64, offset: &FixedOffset) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(ms).and_then(|dt| utc_to_wall_clock(dt, offset))
}

/// A query range for listing remote events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: DateTime<Utc>,
    /// End of the range (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new range.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// A range spanning `back` before and `ahead` after `now`.
    pub fn around(now: DateTime<Utc>, back: Duration, ahead: Duration) -> Self {
        Self::new(now - back, now + ahead)
    }

    /// The window used by sync cycles: three days back, six months ahead.
    pub fn sync_window(now: DateTime<Utc>) -> Self {
        Self::around(now, Duration::days(3), Duration::days(180))
    }

    /// Start as epoch milliseconds.
    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// End as epoch milliseconds.
    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bogota() -> FixedOffset {
        parse_utc_offset("-05:00").unwrap()
    }

    #[test]
    fn parse_offsets() {
        assert_eq!(bogota().local_minus_utc(), -5 * 3600);
        assert_eq!(parse_utc_offset("+0530").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("05:00").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("").is_err());
    }

    #[test]
    fn offset_round_trips_through_format() {
        assert_eq!(format_offset(&bogota()), "-05:00");
        assert_eq!(format_offset(&parse_utc_offset("+00:00").unwrap()), "+00:00");
    }

    #[test]
    fn zulu_timestamp_converts_to_wall_clock() {
        let parsed = parse_remote_timestamp("2024-03-01T14:00:00Z", &bogota()).unwrap();
        assert_eq!(parsed, naive(9, 0));

        let utc = parse_utc_offset("+00:00").unwrap();
        let parsed = parse_remote_timestamp("2024-03-01T14:00:00.000Z", &utc).unwrap();
        assert_eq!(parsed, naive(14, 0));
    }

    #[test]
    fn naive_and_millis_inputs() {
        let utc = parse_utc_offset("+00:00").unwrap();
        assert_eq!(
            parse_remote_timestamp("2024-03-01 09:30:00", &utc),
            Some(naive(9, 30))
        );
        let millis = naive(9, 30).and_utc().timestamp_millis().to_string();
        assert_eq!(parse_remote_timestamp(&millis, &utc), Some(naive(9, 30)));
        assert_eq!(parse_remote_timestamp("not a date", &utc), None);
        assert_eq!(parse_remote_timestamp("  ", &utc), None);
    }

    #[test]
    fn push_formats() {
        assert_eq!(
            format_with_offset(naive(9, 0), &bogota()),
            "2024-03-01T09:00:00-05:00"
        );
        assert_eq!(
            format_zulu(naive(9, 0), &bogota()).as_deref(),
            Some("2024-03-01T14:00:00Z")
        );
        assert_eq!(
            epoch_millis(naive(9, 0), &bogota()),
            Some(naive(14, 0).and_utc().timestamp_millis())
        );
    }

    #[test]
    fn out_of_range_wall_clock_has_no_instant() {
        let late = NaiveDateTime::MAX - Duration::minutes(10);
        assert_eq!(wall_clock_to_utc(late, &bogota()), None);
        assert_eq!(epoch_millis(late, &bogota()), None);
        assert_eq!(format_zulu(late, &bogota()), None);

        let early = NaiveDateTime::MIN + Duration::minutes(10);
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(wall_clock_to_utc(early, &tokyo), None);
        // A positive offset moves a late value back into range.
        assert!(wall_clock_to_utc(late, &tokyo).is_some());

        let last_millis = NaiveDateTime::MAX.and_utc().timestamp_millis();
        assert_eq!(millis_to_wall_clock(last_millis, &tokyo), None);
        assert!(millis_to_wall_clock(last_millis, &bogota()).is_some());
    }

    #[test]
    fn sync_window_bounds() {
        let now = naive(12, 0).and_utc();
        let range = TimeRange::sync_window(now);
        assert_eq!(range.start, now - Duration::days(3));
        assert_eq!(range.end, now + Duration::days(180));
        assert!(range.start_millis() < range.end_millis());
    }
}
