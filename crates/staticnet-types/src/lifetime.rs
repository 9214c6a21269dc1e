//! Human-readable validity windows.
//!
//! Pointer lifetimes are written as a number followed by a unit, with or
//! without a space: `90s`, `15m`, `1h`, `2 days`, `1.5 hours`. A month
//! counts as 30 days.

use std::time::Duration;

use crate::{Result, StaticNetError};

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;
const MONTH: f64 = 30.0 * DAY;

/// Parses a lifetime string into a [`Duration`].
///
/// # Errors
///
/// Returns [`StaticNetError::ConfigError`] if the number is missing or
/// negative, or the unit is unknown.
pub fn parse_lifetime(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number.parse().map_err(|_| StaticNetError::ConfigError {
        reason: format!("lifetime '{input}' does not start with a number"),
    })?;

    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "month" | "months" => MONTH,
        other => {
            return Err(StaticNetError::ConfigError {
                reason: format!("unknown lifetime unit '{other}' in '{input}'"),
            });
        }
    };

    Duration::try_from_secs_f64(value * seconds_per_unit).map_err(|e| {
        StaticNetError::ConfigError {
            reason: format!("lifetime '{input}' out of range: {e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_units() -> Result<()> {
        assert_eq!(parse_lifetime("90s")?, Duration::from_secs(90));
        assert_eq!(parse_lifetime("15m")?, Duration::from_secs(900));
        assert_eq!(parse_lifetime("1h")?, Duration::from_secs(3600));
        assert_eq!(parse_lifetime("2d")?, Duration::from_secs(172_800));
        assert_eq!(parse_lifetime("1w")?, Duration::from_secs(604_800));
        Ok(())
    }

    #[test]
    fn long_units_with_space() -> Result<()> {
        assert_eq!(parse_lifetime("3 hours")?, Duration::from_secs(10_800));
        assert_eq!(parse_lifetime(" 1 month ")?, Duration::from_secs(2_592_000));
        assert_eq!(parse_lifetime("1.5 minutes")?, Duration::from_secs(90));
        Ok(())
    }

    #[test]
    fn missing_number_rejected() {
        assert!(parse_lifetime("hour").is_err());
        assert!(parse_lifetime("").is_err());
    }

    #[test]
    fn unknown_unit_rejected() {
        assert!(parse_lifetime("5 fortnights").is_err());
        assert!(parse_lifetime("10").is_err());
    }
}
