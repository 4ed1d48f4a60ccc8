//! Compact date stamp tokens used as filename prefixes
//!
//! A token is ten characters: three base-26 letters counting days since
//! 2015-01-01, the hour and minute as two decimal digits each, then three
//! base-26 letters for the second-of-minute quantized in steps of
//! `60 / (26^3 - 1)` seconds. Letter `a` is zero, so tokens sort in time
//! order within one day range.
//!
//! ```text
//! 2016-03-04T13:07:30.000000  ->  aoy1307mzm
//! ```

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::error::{Error, Result};

const BASE: u32 = 26;
const DIGITS: usize = 3;
const MAX_VALUE: u32 = BASE * BASE * BASE;
const TOKEN_LEN: usize = 10;
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Width of one quantization step of the seconds field
pub fn seconds_step() -> f64 {
    60.0 / (MAX_VALUE - 1) as f64
}

fn to_letters(mut num: u32) -> String {
    let mut letters = [b'a'; DIGITS];
    for slot in letters.iter_mut().rev() {
        *slot = b'a' + (num % BASE) as u8;
        num /= BASE;
    }
    letters.iter().map(|b| *b as char).collect()
}

fn from_letters(s: &str) -> Option<u32> {
    let mut value = 0u32;
    for c in s.chars() {
        if !c.is_ascii_lowercase() {
            return None;
        }
        value = value * BASE + (c as u32 - 'a' as u32);
    }
    Some(value)
}

/// Stamp a naive (wall clock) datetime
pub fn stamp_datetime(dt: &NaiveDateTime) -> Result<String> {
    let days = dt.date().signed_duration_since(epoch()).num_days();
    if days < 0 || days >= MAX_VALUE as i64 {
        return Err(Error::InvalidDateStamp(format!(
            "{} is outside the representable range",
            dt
        )));
    }
    let secs = dt.second() as f64 + dt.nanosecond() as f64 / 1e9;
    let ticks = (secs / seconds_step()).round() as u32;
    Ok(format!(
        "{}{:02}{:02}{}",
        to_letters(days as u32),
        dt.hour(),
        dt.minute(),
        to_letters(ticks.min(MAX_VALUE - 1))
    ))
}

/// Parse an ISO-like timestamp (`YYYY-MM-DDTHH:MM:SS[.ffffff]`)
pub fn parse_iso(iso: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(iso.trim(), "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| Error::InvalidDateStamp(format!("{:?}: {}", iso, e)))
}

/// Format a naive datetime the way dataset metadata stores it
pub fn format_iso(dt: &NaiveDateTime) -> String {
    dt.format(ISO_FORMAT).to_string()
}

/// Convert an ISO timestamp into a token
pub fn stamp(iso: &str) -> Result<String> {
    stamp_datetime(&parse_iso(iso)?)
}

/// Decode a token back into the datetime it quantizes
pub fn invert_datetime(token: &str) -> Result<NaiveDateTime> {
    let malformed = || Error::InvalidDateStamp(format!("malformed token {:?}", token));
    if token.len() != TOKEN_LEN || !token.is_ascii() {
        return Err(malformed());
    }
    let days = from_letters(&token[0..3]).ok_or_else(malformed)?;
    let hour: u32 = token[3..5].parse().map_err(|_| malformed())?;
    let minute: u32 = token[5..7].parse().map_err(|_| malformed())?;
    let ticks = from_letters(&token[7..10]).ok_or_else(malformed)?;

    let date = epoch() + Duration::days(days as i64);
    let base = date.and_hms_opt(hour, minute, 0).ok_or_else(malformed)?;
    let micros = (ticks as f64 * seconds_step() * 1e6).round() as i64;
    Ok(base + Duration::microseconds(micros))
}

/// Convert a token back into an ISO timestamp
pub fn invert(token: &str) -> Result<String> {
    invert_datetime(token).map(|dt| format_iso(&dt))
}

/// Token for the current local time
pub fn now() -> Result<String> {
    stamp_datetime(&Local::now().naive_local())
}

/// Current Unix time in fractional seconds
pub fn now_epoch() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_token() {
        let token = stamp("2015-01-01T00:00:00").unwrap();
        assert_eq!(token, "aaa0000aaa");
        let token = stamp("2015-01-27T09:05:00").unwrap();
        assert_eq!(&token[0..3], "aba");
        assert_eq!(&token[3..7], "0905");
    }

    #[test]
    fn test_invert_round_trip() {
        let token = stamp("2016-03-04T13:07:30").unwrap();
        let iso = invert(&token).unwrap();
        assert!(iso.starts_with("2016-03-04T13:07:"));
        let back = parse_iso(&iso).unwrap();
        let original = parse_iso("2016-03-04T13:07:30").unwrap();
        let delta = (back - original).num_microseconds().unwrap().abs();
        assert!(delta as f64 <= seconds_step() * 1e6 / 2.0 + 1.0);
    }

    #[test]
    fn test_out_of_range_dates() {
        assert!(stamp("2014-12-31T23:59:59").is_err());
        assert!(stamp("2070-01-01T00:00:00").is_err());
        assert!(stamp("not a date").is_err());
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(invert("abc").is_err());
        assert!(invert("ABC1200aaa").is_err());
        assert!(invert("aaa12xxaaa").is_err());
        assert!(invert("aaa2500aaa").is_err());
    }

    #[test]
    fn test_top_of_minute_carries() {
        let iso = invert("aaa0000zzz").unwrap();
        assert_eq!(iso, "2015-01-01T00:01:00.000000");
    }

    #[test]
    fn test_now_is_valid() {
        let token = now().unwrap();
        assert_eq!(token.len(), 10);
        assert!(invert(&token).is_ok());
        assert!(now_epoch() > 1.4e9);
    }

    proptest! {
        #[test]
        fn prop_stamp_invert_within_one_step(
            days in 0i64..17000,
            secs_of_day in 0u32..86_400,
            micros in 0u32..1_000_000,
        ) {
            let date = epoch() + Duration::days(days);
            let dt = date.and_hms_opt(0, 0, 0).unwrap()
                + Duration::seconds(secs_of_day as i64)
                + Duration::microseconds(micros as i64);
            let token = stamp_datetime(&dt).unwrap();
            let back = invert_datetime(&token).unwrap();
            let delta = (back - dt).num_microseconds().unwrap().abs() as f64;
            prop_assert!(delta <= seconds_step() * 1e6 / 2.0 + 1.0);
        }
    }
}
