//! Deadline-expression parsing.
//!
//! Converts a free-form schedule phrase into an absolute instant, or rejects
//! it. The grammar is deliberately tiny: callers enforce a minimum lead time
//! and uniformly reject `None` or past results, so unambiguous rejection
//! matters more than parsing precision.
//!
//! Supported forms, in precedence order:
//! 1. `in <number> <unit>`: relative offset, hour or minute units
//! 2. `H[:MM]`: today at that clock time, rolled to the next day if the
//!    instant is already behind `now`
//! 3. `tomorrow`: tomorrow at the default evening hour (only reachable when
//!    the text carries no digits, given rule 2)

use chrono::{DateTime, Days, Duration as ChronoDuration, TimeZone};

/// Clock hour assumed for a bare "tomorrow"
pub const DEFAULT_EVENING_HOUR: u32 = 21;

const HOUR_UNITS: &[&str] = &["hour", "hours", "hr", "hrs", "h"];
const MINUTE_UNITS: &[&str] = &["minute", "minutes", "min", "mins", "m"];

/// Parse a schedule phrase against `now`, assuming 21:00 for a bare
/// "tomorrow". Pure and deterministic given `(input, now)`.
pub fn parse_deadline<Tz: TimeZone>(input: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    parse_deadline_with(input, now, DEFAULT_EVENING_HOUR)
}

/// Parse a schedule phrase with a configurable default evening hour
pub fn parse_deadline_with<Tz: TimeZone>(
    input: &str,
    now: DateTime<Tz>,
    default_hour: u32,
) -> Option<DateTime<Tz>> {
    let input = input.trim().to_lowercase();

    if let Some(rest) = input.strip_prefix("in ") {
        return parse_relative(rest, now);
    }

    if let Some((hour, minute)) = find_clock_time(&input) {
        return clock_time_today_or_next(now, hour, minute);
    }

    if input.contains("tomorrow") {
        let tomorrow = now.date_naive().checked_add_days(Days::new(1))?;
        let naive = tomorrow.and_hms_opt(default_hour, 0, 0)?;
        return now.timezone().from_local_datetime(&naive).earliest();
    }

    None
}

/// `<number> <unit>` or `<number><unit>`, e.g. "3 hours", "45 min", "2h"
fn parse_relative<Tz: TimeZone>(rest: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let (amount_text, unit_text) = split_amount_and_unit(rest)?;
    let amount: f64 = amount_text.parse().ok()?;
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }

    let unit_millis: f64 = if HOUR_UNITS.contains(&unit_text) {
        3_600_000.0
    } else if MINUTE_UNITS.contains(&unit_text) {
        60_000.0
    } else {
        return None;
    };

    let offset = ChronoDuration::milliseconds((amount * unit_millis).round() as i64);
    now.checked_add_signed(offset)
}

fn split_amount_and_unit(rest: &str) -> Option<(&str, &str)> {
    let mut tokens = rest.split_whitespace();
    let first = tokens.next()?;
    match tokens.next() {
        // "3 hours"
        Some(unit) if tokens.next().is_none() => Some((first, unit)),
        Some(_) => None,
        // "3h": split at the first non-numeric character
        None => {
            let boundary = first.find(|c: char| !c.is_ascii_digit() && c != '.')?;
            let (amount, unit) = first.split_at(boundary);
            if amount.is_empty() {
                return None;
            }
            Some((amount, unit))
        }
    }
}

/// First `H[:MM]` occurrence anywhere in the text: one or two digits, an
/// optional colon, then exactly two digits for the minutes ("2230" reads as
/// 22:30).
fn find_clock_time(input: &str) -> Option<(u32, u32)> {
    let bytes = input.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;

    let mut pos = start;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() && pos - start < 2 {
        pos += 1;
    }
    let hour: u32 = input[start..pos].parse().ok()?;

    let mut rest = pos;
    if rest < bytes.len() && bytes[rest] == b':' {
        rest += 1;
    }
    let minute = if rest + 2 <= bytes.len()
        && bytes[rest].is_ascii_digit()
        && bytes[rest + 1].is_ascii_digit()
    {
        input[rest..rest + 2].parse().ok()?
    } else {
        0
    };

    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

fn clock_time_today_or_next<Tz: TimeZone>(
    now: DateTime<Tz>,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>> {
    let today = now.date_naive();
    let naive = today.and_hms_opt(hour, minute, 0)?;
    let candidate = now.timezone().from_local_datetime(&naive).earliest()?;
    if candidate < now {
        let naive = today.checked_add_days(Days::new(1))?.and_hms_opt(hour, minute, 0)?;
        now.timezone().from_local_datetime(&naive).earliest()
    } else {
        Some(candidate)
    }
}
