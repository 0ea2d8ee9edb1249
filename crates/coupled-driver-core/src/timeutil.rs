// crates/coupled-driver-core/src/timeutil.rs
// ============================================================================
// Module: Time Parsing
// Description: Datetime and duration coercion for configuration values.
// Purpose: Accept the human-readable time formats used in run parameters.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! Run parameters carry datetimes such as `2008-08-23 00:00:00` and durations
//! such as `14 days, 12:00:00` or `06:00:00`. This module converts both
//! directions and exposes serde adapters so JSON configuration files stay
//! human-readable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::DriverError;
use crate::error::DriverResult;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Canonical datetime format.
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// ISO-8601 style with a `T` separator.
const DATETIME_ISO_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Datetime without seconds.
const DATETIME_MINUTES_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Date with dashes.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Compact date.
const COMPACT_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]");

/// Seconds in one day.
const SECONDS_PER_DAY: i64 = 86_400;

// ============================================================================
// SECTION: Datetimes
// ============================================================================

/// Parses a datetime in any of the accepted layouts.
///
/// # Errors
///
/// Returns [`DriverError::InvalidTime`] when no layout matches.
pub fn parse_datetime(value: &str) -> DriverResult<PrimitiveDateTime> {
    let trimmed = value.trim();
    for format in [DATETIME_FORMAT, DATETIME_ISO_FORMAT, DATETIME_MINUTES_FORMAT] {
        if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, format) {
            return Ok(parsed);
        }
    }
    for format in [DATE_FORMAT, COMPACT_DATE_FORMAT] {
        if let Ok(date) = time::Date::parse(trimmed, format) {
            return Ok(date.midnight());
        }
    }
    Err(DriverError::InvalidTime(value.to_string()))
}

/// Formats a datetime as `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn format_datetime(value: PrimitiveDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        value.year(),
        u8::from(value.month()),
        value.day(),
        value.hour(),
        value.minute(),
        value.second()
    )
}

// ============================================================================
// SECTION: Durations
// ============================================================================

/// Parses a duration written as `H:MM:SS`, `D days, H:MM:SS`, or seconds.
///
/// # Errors
///
/// Returns [`DriverError::InvalidTime`] when the value is malformed or
/// negative.
pub fn parse_duration(value: &str) -> DriverResult<Duration> {
    let invalid = || DriverError::InvalidTime(value.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if !trimmed.contains(':') {
        let seconds: f64 = trimmed.parse().map_err(|_| invalid())?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid());
        }
        return Ok(Duration::seconds_f64(seconds));
    }

    let (days, clock) = match trimmed.split_once(',') {
        Some((days, clock)) => {
            let count = days
                .trim()
                .strip_suffix("days")
                .or_else(|| days.trim().strip_suffix("day"))
                .ok_or_else(invalid)?;
            let count: i64 = count.trim().parse().map_err(|_| invalid())?;
            (count, clock.trim())
        }
        None => (0, trimmed),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(invalid());
    };
    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
    if days < 0 || hours < 0 || !(0..60).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err(invalid());
    }
    let whole = days * SECONDS_PER_DAY + hours * 3_600 + minutes * 60;
    Ok(Duration::seconds(whole) + Duration::seconds_f64(seconds))
}

/// Formats a duration as `[D day(s), ]H:MM:SS[.ffffff]`.
#[must_use]
pub fn format_duration(value: Duration) -> String {
    let total = value.whole_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let days = total / SECONDS_PER_DAY;
    let remainder = total % SECONDS_PER_DAY;
    let clock = format!("{}:{:02}:{:02}", remainder / 3_600, (remainder % 3_600) / 60, remainder % 60);
    let micros = value.subsec_microseconds().unsigned_abs();
    let clock = if micros > 0 { format!("{clock}.{micros:06}") } else { clock };
    match days {
        0 => format!("{sign}{clock}"),
        1 => format!("{sign}1 day, {clock}"),
        _ => format!("{sign}{days} days, {clock}"),
    }
}

/// Formats a wall-clock limit as `HH:MM:SS` without wrapping hours at 24.
#[must_use]
pub fn format_wall_clock(value: Duration) -> String {
    let seconds = value.as_seconds_f64().round();
    #[allow(clippy::cast_possible_truncation, reason = "Wall-clock limits are far below i64::MAX seconds.")]
    let total = seconds as i64;
    format!("{:02}:{:02}:{:02}", total / 3_600, (total % 3_600) / 60, total % 60)
}

// ============================================================================
// SECTION: Serde Adapters
// ============================================================================

/// Serde adapter for required datetimes.
pub mod serde_datetime {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use time::PrimitiveDateTime;

    /// Serializes a datetime as `YYYY-MM-DD HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_datetime(*value))
    }

    /// Deserializes a datetime from any accepted layout.
    ///
    /// # Errors
    ///
    /// Returns an error when the string is not a datetime.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PrimitiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_datetime(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional datetimes.
pub mod serde_datetime_option {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use time::PrimitiveDateTime;

    /// Serializes an optional datetime.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<PrimitiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&super::format_datetime(*value)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional datetime.
    ///
    /// # Errors
    ///
    /// Returns an error when a present string is not a datetime.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<PrimitiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::parse_datetime(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Serde adapter for required durations.
pub mod serde_duration {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use time::Duration;

    /// Serializes a duration as `[D days, ]H:MM:SS`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*value))
    }

    /// Deserializes a duration from any accepted layout.
    ///
    /// # Errors
    ///
    /// Returns an error when the string is not a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional durations.
pub mod serde_duration_option {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use time::Duration;

    /// Serializes an optional duration.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&super::format_duration(*value)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional duration.
    ///
    /// # Errors
    ///
    /// Returns an error when a present string is not a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::parse_duration(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use time::macros::datetime;

    use super::*;

    #[test]
    fn parses_each_datetime_layout() {
        let expected = datetime!(2008-08-23 00:00:00);
        assert_eq!(parse_datetime("2008-08-23 00:00:00").unwrap(), expected);
        assert_eq!(parse_datetime("2008-08-23T00:00:00").unwrap(), expected);
        assert_eq!(parse_datetime("2008-08-23 00:00").unwrap(), expected);
        assert_eq!(parse_datetime("2008-08-23").unwrap(), expected);
        assert_eq!(parse_datetime("20080823").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_datetime() {
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn parses_day_durations() {
        assert_eq!(parse_duration("14 days, 12:00:00").unwrap(), Duration::hours(348));
        assert_eq!(parse_duration("1 day, 0:00:00").unwrap(), Duration::days(1));
        assert_eq!(parse_duration("06:00:00").unwrap(), Duration::hours(6));
        assert_eq!(parse_duration("3600").unwrap(), Duration::hours(1));
        assert_eq!(parse_duration("2.5").unwrap(), Duration::milliseconds(2_500));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1:2").is_err());
        assert!(parse_duration("0:75:00").is_err());
        assert!(parse_duration("-5").is_err());
        assert!(parse_duration("2 weeks, 0:00:00").is_err());
    }

    #[test]
    fn formats_like_timedelta() {
        assert_eq!(format_duration(Duration::hours(6)), "6:00:00");
        assert_eq!(format_duration(Duration::days(1)), "1 day, 0:00:00");
        assert_eq!(format_duration(Duration::hours(348)), "14 days, 12:00:00");
        assert_eq!(format_duration(Duration::milliseconds(2_500)), "0:00:02.500000");
    }

    #[test]
    fn wall_clock_does_not_wrap_days() {
        assert_eq!(format_wall_clock(Duration::hours(6)), "06:00:00");
        assert_eq!(format_wall_clock(Duration::hours(30)), "30:00:00");
        assert_eq!(format_wall_clock(Duration::minutes(90)), "01:30:00");
    }

    #[test]
    fn formats_datetime_canonically() {
        assert_eq!(format_datetime(datetime!(2012-10-22 06:00:00)), "2012-10-22 06:00:00");
    }
}
