//! `xs:dateTime` and `xs:duration` handling for agreement validity.

use crate::error::{Result, UnifyError};
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};

const SECONDS_PER_DAY: i64 = 86_400;
const DAYS_PER_YEAR: i64 = 365;
const DAYS_PER_MONTH: i64 = 30;

/// Parse an `xs:dateTime`. Values without a zone offset are taken as UTC.
pub fn parse_datetime(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| UnifyError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an ISO 8601 duration such as `P1Y2M3DT4H5M6.5S` or `P2W`.
///
/// Years and months have no fixed length; they are counted as 365 and 30
/// days respectively. Negative durations are rejected.
pub fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    let invalid = |reason: &str| UnifyError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let body = value
        .trim()
        .strip_prefix('P')
        .ok_or_else(|| invalid("duration must start with P"))?;
    if body.is_empty() {
        return Err(invalid("empty duration"));
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((_, "")) => return Err(invalid("empty time part")),
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut millis: i64 = 0;
    for (amount, unit) in components(date_part).map_err(|r| invalid(r))? {
        let days = match unit {
            'Y' => DAYS_PER_YEAR,
            'M' => DAYS_PER_MONTH,
            'W' => 7,
            'D' => 1,
            _ => return Err(invalid("unknown date designator")),
        };
        millis = millis
            .checked_add((amount * (days * SECONDS_PER_DAY) as f64 * 1000.0) as i64)
            .ok_or_else(|| invalid("duration out of range"))?;
    }
    if let Some(time) = time_part {
        for (amount, unit) in components(time).map_err(|r| invalid(r))? {
            let seconds = match unit {
                'H' => 3600.0,
                'M' => 60.0,
                'S' => 1.0,
                _ => return Err(invalid("unknown time designator")),
            };
            millis = millis
                .checked_add((amount * seconds * 1000.0) as i64)
                .ok_or_else(|| invalid("duration out of range"))?;
        }
    }
    Duration::try_milliseconds(millis).ok_or_else(|| invalid("duration out of range"))
}

fn components(part: &str) -> std::result::Result<Vec<(f64, char)>, &'static str> {
    let mut out = Vec::new();
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
        } else if c.is_ascii_alphabetic() {
            if number.is_empty() {
                return Err("designator without a number");
            }
            let amount: f64 = number.parse().map_err(|_| "malformed number")?;
            out.push((amount, c));
            number.clear();
        } else {
            return Err("unexpected character");
        }
    }
    if !number.is_empty() {
        return Err("number without a designator");
    }
    Ok(out)
}
