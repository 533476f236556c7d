//! `saveTime` handling.
//!
//! The game writes ISO-8601 timestamps with a numeric UTC offset and up to
//! seven fractional-second digits (100 ns resolution), e.g.
//! `2025-04-18T20:31:33.1234567+08:00`. Input is parsed tolerantly: the
//! fraction may be shorter, longer (extra digits truncated) or absent, and a
//! `Z` suffix is accepted. Output is always the canonical seven-digit,
//! numeric-offset form.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike};

use crate::error::CoreError;

const FRACTION_DIGITS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTime {
    instant: DateTime<FixedOffset>,
}

impl SaveTime {
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let s = text.trim();
        if s.len() < 19 || !s.is_char_boundary(19) {
            return Err(bad_time(s, "too short for an ISO-8601 date-time"));
        }

        let (core, rest) = s.split_at(19);
        let naive = NaiveDateTime::parse_from_str(core, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(core, "%Y-%m-%d %H:%M:%S"))
            .map_err(|e| bad_time(s, &e.to_string()))?;

        let (nanos, offset_text) = split_fraction(rest).ok_or_else(|| {
            bad_time(s, "malformed fractional seconds")
        })?;
        let offset = parse_offset(offset_text).ok_or_else(|| {
            bad_time(s, "malformed UTC offset")
        })?;

        let naive = naive
            .with_nanosecond(nanos)
            .ok_or_else(|| bad_time(s, "fractional seconds out of range"))?;
        let instant = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| bad_time(s, "ambiguous local date-time"))?;

        Ok(Self { instant })
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    /// Canonical form: seven fractional digits, numeric offset, never `Z`.
    pub fn format(&self) -> String {
        let frac = self.instant.nanosecond() % 1_000_000_000 / 100;
        let offset_secs = self.instant.offset().local_minus_utc();
        let sign = if offset_secs < 0 { '-' } else { '+' };
        let abs = offset_secs.abs();
        format!(
            "{}.{:07}{}{:02}:{:02}",
            self.instant.format("%Y-%m-%dT%H:%M:%S"),
            frac,
            sign,
            abs / 3600,
            abs % 3600 / 60,
        )
    }
}

/// Splits the post-seconds tail into nanoseconds and the offset text.
/// Digits beyond the seventh are truncated.
fn split_fraction(rest: &str) -> Option<(u32, &str)> {
    let Some(after_dot) = rest.strip_prefix('.') else {
        return Some((0, rest));
    };

    let digit_count = after_dot.chars().take_while(char::is_ascii_digit).count();
    if digit_count == 0 {
        return None;
    }
    let digits = &after_dot[..digit_count];
    let kept = &digits[..digit_count.min(FRACTION_DIGITS)];

    let mut padded = String::from(kept);
    while padded.len() < FRACTION_DIGITS {
        padded.push('0');
    }
    let hundreds_of_nanos: u32 = padded.parse().ok()?;

    Some((hundreds_of_nanos * 100, &after_dot[digit_count..]))
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    // Missing offset and `Z` both mean UTC on input.
    if text.is_empty() || text == "Z" || text == "z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, body) = match text.split_at_checked(1)? {
        ("+", body) => (1, body),
        ("-", body) => (-1, body),
        _ => return None,
    };
    if !body.is_ascii() {
        return None;
    }

    let (hours, minutes) = match body.len() {
        2 => (body.parse::<i32>().ok()?, 0),
        4 => (body[..2].parse::<i32>().ok()?, body[2..].parse::<i32>().ok()?),
        5 if body.as_bytes()[2] == b':' => {
            (body[..2].parse::<i32>().ok()?, body[3..].parse::<i32>().ok()?)
        }
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn bad_time(text: &str, detail: &str) -> CoreError {
    CoreError::malformed(format!("invalid saveTime {text:?}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::SaveTime;

    #[test]
    fn canonical_form_round_trips_exactly() {
        let text = "2025-04-18T20:31:33.1234567+08:00";
        let time = SaveTime::parse(text).unwrap();
        assert_eq!(time.format(), text);
    }

    #[test]
    fn short_fraction_is_padded() {
        let time = SaveTime::parse("2025-04-18T20:31:33.5+08:00").unwrap();
        assert_eq!(time.format(), "2025-04-18T20:31:33.5000000+08:00");
    }

    #[test]
    fn missing_fraction_becomes_zeroes() {
        let time = SaveTime::parse("2025-04-18T20:31:33+00:00").unwrap();
        assert_eq!(time.format(), "2025-04-18T20:31:33.0000000+00:00");
    }

    #[test]
    fn overlong_fraction_is_truncated() {
        let time = SaveTime::parse("2025-04-18T20:31:33.123456789+08:00").unwrap();
        assert_eq!(time.format(), "2025-04-18T20:31:33.1234567+08:00");
    }

    #[test]
    fn zulu_suffix_is_accepted_and_canonicalized() {
        let time = SaveTime::parse("2025-04-18T12:31:33.25Z").unwrap();
        assert_eq!(time.format(), "2025-04-18T12:31:33.2500000+00:00");
    }

    #[test]
    fn negative_offsets_survive() {
        let text = "2024-12-31T23:59:59.0000001-05:30";
        assert_eq!(SaveTime::parse(text).unwrap().format(), text);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(SaveTime::parse("yesterday").is_err());
        assert!(SaveTime::parse("2025-04-18").is_err());
        assert!(SaveTime::parse("2025-04-18T20:31:33.+08:00").is_err());
        assert!(SaveTime::parse("2025-04-18T20:31:33.5*08:00").is_err());
    }
}
