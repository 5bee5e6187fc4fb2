//! Time-of-day arithmetic used for lane times, ranks and the HUD.
//!
//! All timestamps carry a fixed UTC offset: the offset the operator reads
//! the clock in. Time-of-day values are taken on that wall clock.

use chrono::{DateTime, FixedOffset, Local, TimeDelta, Timelike};
use thiserror::Error;

pub type Timestamp = DateTime<FixedOffset>;

pub const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("too many ':' separated fields in {0:?}")]
    TooManyFields(String),
    #[error("invalid number {0:?}")]
    InvalidField(String),
    #[error("time of day out of range: {0:?}")]
    OutOfRange(String),
}

/// Milliseconds since wall-clock midnight.
pub fn ms_of_day(t: &Timestamp) -> i64 {
    i64::from(t.num_seconds_from_midnight()) * 1000
        + i64::from(t.nanosecond() % 1_000_000_000 / 1_000_000)
}

/// Wall-clock midnight starting the calendar day of `t`.
pub fn start_of_day(t: &Timestamp) -> Timestamp {
    *t - TimeDelta::seconds(i64::from(t.num_seconds_from_midnight()))
        - TimeDelta::nanoseconds(i64::from(t.nanosecond()))
}

/// Convert a (fractional) number of seconds to a duration, microsecond precision.
pub fn seconds(s: f64) -> TimeDelta {
    TimeDelta::microseconds((s * 1e6).round() as i64)
}

/// Signed seconds from `b` to `a`.
pub fn seconds_between(a: &Timestamp, b: &Timestamp) -> f64 {
    let delta = a.signed_duration_since(*b);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Timestamp for epoch seconds, shown in `offset`.
pub fn from_epoch_seconds(secs: f64, offset: FixedOffset) -> Option<Timestamp> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((secs * 1e6).round() as i64).map(|t| t.with_timezone(&offset))
}

/// Signed milliseconds between the time-of-day components of `a` and `b`,
/// ignoring their calendar dates.
///
/// Only meaningful for timestamps sharing one offset; a mismatch is logged
/// and the difference is still returned.
pub fn time_of_day_difference_ms(a: &Timestamp, b: &Timestamp) -> i64 {
    if a.offset() != b.offset() {
        log::warn!(
            "subtracting times of day across different UTC offsets ({} vs {}) may give unexpected results",
            a.offset(),
            b.offset()
        );
    }
    ms_of_day(a) - ms_of_day(b)
}

/// A timestamp on `a`'s calendar date whose time of day is the difference
/// between the times of day of `a` and `b`. Negative differences wrap around
/// midnight, so the result always stays on `a`'s date.
pub fn time_of_day_difference(a: &Timestamp, b: &Timestamp) -> Timestamp {
    let diff = time_of_day_difference_ms(a, b).rem_euclid(MS_PER_DAY);
    start_of_day(a) + TimeDelta::milliseconds(diff)
}

pub fn add_seconds(t: Option<Timestamp>, s: f64) -> Option<Timestamp> {
    t.and_then(|t| checked_add_seconds(&t, s))
}

/// `t` moved by `s` seconds, or `None` when `s` is not finite or the result
/// falls outside the representable range.
pub fn checked_add_seconds(t: &Timestamp, s: f64) -> Option<Timestamp> {
    if !s.is_finite() {
        return None;
    }
    t.checked_add_signed(seconds(s))
}

/// `HH:MM:SS.CC`, or `MM:SS.CC` when `compact_hours` is set and the hour is 0.
pub fn format_time(t: &Timestamp, compact_hours: bool) -> String {
    let hundredths = t.nanosecond() % 1_000_000_000 / 10_000_000;
    if compact_hours && t.hour() == 0 {
        format!("{:02}:{:02}.{:02}", t.minute(), t.second(), hundredths)
    } else {
        format!(
            "{:02}:{:02}:{:02}.{:02}",
            t.hour(),
            t.minute(),
            t.second(),
            hundredths
        )
    }
}

/// Parse `H:M:S.cc` (every part optional) onto the calendar date of `base`,
/// or of today when no base is given.
pub fn parse_time(text: &str, base: Option<&Timestamp>) -> Result<Timestamp, TimeParseError> {
    let base = base.copied().unwrap_or_else(|| Local::now().fixed_offset());
    let trimmed = text.trim();
    let (clock, fraction) = match trimmed.split_once('.') {
        Some((clock, fraction)) => (clock, fraction),
        None => (trimmed, ""),
    };

    let mut fields = [0i64; 3];
    if !clock.is_empty() {
        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() > fields.len() {
            return Err(TimeParseError::TooManyFields(text.to_string()));
        }
        for (slot, part) in fields.iter_mut().zip(&parts) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            *slot = part
                .parse::<u32>()
                .map_err(|_| TimeParseError::InvalidField(part.to_string()))?
                .into();
        }
    }
    let [hours, minutes, secs] = fields;
    if hours > 23 || minutes > 59 || secs > 59 {
        return Err(TimeParseError::OutOfRange(text.to_string()));
    }

    let millis = parse_fraction_ms(fraction)?;
    let offset_ms = ((hours * 60 + minutes) * 60 + secs) * 1000 + millis;
    Ok(start_of_day(&base) + TimeDelta::milliseconds(offset_ms))
}

/// Decimal fraction of a second as milliseconds; digits past the third are dropped.
fn parse_fraction_ms(fraction: &str) -> Result<i64, TimeParseError> {
    let fraction = fraction.trim();
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(TimeParseError::InvalidField(fraction.to_string()));
    }
    let mut millis = 0i64;
    let mut scale = 100i64;
    for digit in fraction.bytes().take(3) {
        millis += i64::from(digit - b'0') * scale;
        scale /= 10;
    }
    Ok(millis)
}
