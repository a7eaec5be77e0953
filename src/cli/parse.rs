use std::{fmt::Display, ops::RangeInclusive, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

pub fn parse_range_inclusive<N: PartialEq + PartialOrd + FromStr + Display>(
    s: &str,
    range: RangeInclusive<N>,
) -> Result<N, String> {
    let value: N = s.parse().map_err(|_| "invalid numeric value")?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} is not in range {}-{}",
            value,
            range.start(),
            range.end(),
        ))
    }
}

/// Parses sizes such as `512`, `10k`, `1.5MB` or `2GiB` into bytes.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number.parse().map_err(|_| "invalid size")?;
    let multiplier: u64 = match unit.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        "ti" | "tib" => 1 << 40,
        other => return Err(format!("unknown size unit '{other}'")),
    };

    Ok((value * multiplier as f64).round() as u64)
}

/// Parses an RFC 3339 timestamp (with or without a zone) or a bare date,
/// which means midnight UTC.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or("invalid date")?;
        return Ok(midnight.and_utc());
    }

    humantime::parse_rfc3339_weak(s)
        .map(DateTime::<Utc>::from)
        .map_err(|err| err.to_string())
}

/// Settings values are JSON; anything that does not parse is taken as a
/// plain string.
pub fn parse_setting_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{parse_range_inclusive, parse_setting_value, parse_size, parse_time};

    #[test]
    fn ranges_are_inclusive() {
        assert_eq!(parse_range_inclusive("1", 1..=3), Ok(1));
        assert_eq!(parse_range_inclusive("3", 1..=3), Ok(3));
        assert_eq!(
            parse_range_inclusive("4", 1..=3),
            Err("4 is not in range 1-3".to_owned())
        );
        assert!(parse_range_inclusive::<u8>("x", 1..=3).is_err());
    }

    #[test]
    fn sizes_with_units() {
        assert_eq!(parse_size("512"), Ok(512));
        assert_eq!(parse_size("10k"), Ok(10_000));
        assert_eq!(parse_size("1.5MB"), Ok(1_500_000));
        assert_eq!(parse_size("2GiB"), Ok(2 << 30));
        assert!(parse_size("3 parsecs").is_err());
        assert!(parse_size("MB").is_err());
    }

    #[test]
    fn dates_and_timestamps() {
        assert_eq!(
            parse_time("2024-01-31"),
            Ok(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_time("2024-01-31T12:30:00Z"),
            Ok(Utc.with_ymd_and_hms(2024, 1, 31, 12, 30, 0).unwrap())
        );
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn setting_values_fall_back_to_strings() {
        assert_eq!(parse_setting_value("true"), json!(true));
        assert_eq!(parse_setting_value("42"), json!(42));
        assert_eq!(parse_setting_value("[\"a\"]"), json!(["a"]));
        assert_eq!(parse_setting_value("size"), json!("size"));
    }
}
