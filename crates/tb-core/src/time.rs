//! Clock-time parsing.
//!
//! Catalog and generator times arrive as human-readable strings such as
//! `9:30AM`, `10:00 am` or `14:15`. They are normalized to minutes since
//! midnight so meeting blocks can be compared numerically.

use thiserror::Error;

/// Number of minutes in one day; normalized times are always below this.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Separator between the start and end of a time range.
pub const RANGE_SEPARATOR: &str = " - ";

/// Errors produced while parsing a time or time range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeFormatError {
    #[error("time {input:?} contains no digits")]
    NoDigits { input: String },

    #[error("invalid {component} in time {input:?}")]
    InvalidNumber {
        component: &'static str,
        input: String,
    },

    #[error("unknown period marker {marker:?} in time {input:?}")]
    UnknownPeriod { marker: String, input: String },

    #[error("time {input:?} is outside a single day")]
    OutOfRange { input: String },

    #[error("time range {input:?} must be \"START - END\"")]
    MalformedRange { input: String },

    #[error("time range {input:?} ends before it starts")]
    EndsBeforeStart { input: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Am,
    Pm,
}

/// Parses a clock time into minutes since midnight (`0..1440`).
///
/// Accepts `H:MMAM`, `H:MM AM` and 24-hour `HH:MM`. The AM/PM marker is
/// case-insensitive and may be separated from the digits by whitespace. A
/// missing minute component defaults to zero.
pub fn normalize(input: &str) -> Result<u16, TimeFormatError> {
    let trimmed = input.trim();
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return Err(TimeFormatError::NoDigits {
            input: input.to_string(),
        });
    }

    let split = trimmed
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(trimmed.len());
    let (clock, marker) = trimmed.split_at(split);
    let period = parse_period(marker.trim(), input)?;

    let (hour, minute) = clock.trim().split_once(':').unwrap_or((clock, "0"));
    let hour = parse_component(hour, "hour", input)?;
    let minute = parse_component(minute, "minute", input)?;
    if minute >= 60 {
        return Err(out_of_range(input));
    }

    let hour = match period {
        Some(_) if !(1..=12).contains(&hour) => return Err(out_of_range(input)),
        Some(Period::Am) if hour == 12 => 0,
        Some(Period::Pm) if hour != 12 => hour + 12,
        Some(_) => hour,
        None if hour >= 24 => return Err(out_of_range(input)),
        None => hour,
    };

    Ok(hour * 60 + minute)
}

/// Parses a `"START - END"` range into start and end minutes.
///
/// Ranges that wrap past midnight are rejected rather than wrapped.
pub fn parse_range(input: &str) -> Result<(u16, u16), TimeFormatError> {
    let parts: Vec<&str> = input.trim().split(RANGE_SEPARATOR).collect();
    let [start, end] = parts.as_slice() else {
        return Err(TimeFormatError::MalformedRange {
            input: input.to_string(),
        });
    };

    let start = normalize(start)?;
    let end = normalize(end)?;
    if end < start {
        return Err(TimeFormatError::EndsBeforeStart {
            input: input.to_string(),
        });
    }
    Ok((start, end))
}

/// Renders minutes since midnight as a 12-hour clock time, e.g. `9:05AM`.
pub fn format_minutes(minutes: u16) -> String {
    let hour = minutes / 60 % 24;
    let minute = minutes % 60;
    let (display_hour, marker) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{display_hour}:{minute:02}{marker}")
}

fn parse_period(marker: &str, input: &str) -> Result<Option<Period>, TimeFormatError> {
    if marker.is_empty() {
        return Ok(None);
    }
    match marker.to_ascii_uppercase().as_str() {
        "AM" => Ok(Some(Period::Am)),
        "PM" => Ok(Some(Period::Pm)),
        _ => Err(TimeFormatError::UnknownPeriod {
            marker: marker.to_string(),
            input: input.to_string(),
        }),
    }
}

fn parse_component(raw: &str, component: &'static str, input: &str) -> Result<u16, TimeFormatError> {
    raw.trim()
        .parse()
        .map_err(|_| TimeFormatError::InvalidNumber {
            component,
            input: input.to_string(),
        })
}

fn out_of_range(input: &str) -> TimeFormatError {
    TimeFormatError::OutOfRange {
        input: input.to_string(),
    }
}
