//! Serde adapter for `std::time::Duration` as an ISO-8601 duration string.
//!
//! ```rust
//! use restwire_core::model::iso_duration;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Job {
//!     #[serde(with = "iso_duration")]
//!     timeout: Duration,
//! }
//!
//! let job = Job { timeout: Duration::from_millis(131_592_555) };
//! assert_eq!(serde_json::to_string(&job)?, r#"{"timeout":"P1DT12H33M12.555S"}"#);
//!
//! // The legacy `d.hh:mm:ss.fffffff` form is accepted on read.
//! let job: Job = serde_json::from_str(r#"{"timeout":"1.12:33:12.5550000"}"#)?;
//! assert_eq!(job.timeout, Duration::from_millis(131_592_555));
//! # Ok::<(), serde_json::Error>(())
//! ```
use regex::Regex;
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
use std::{fmt::Write, sync::LazyLock, time::Duration};

const SECONDS_PER_DAY: u64 = 86_400;

static ISO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:[.,](\d{1,9}))?S)?)?$")
        .expect("valid ISO-8601 duration pattern")
});

static LEGACY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)\.)?(\d{1,2}):(\d{2}):(\d{2})(?:\.(\d{1,9}))?$")
        .expect("valid legacy duration pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid duration")]
pub struct DurationParseError(String);

pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*duration))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse(&text).map_err(D::Error::custom)
}

/// Formats a duration as `P[nD][T[nH][nM][n[.f]S]]`, omitting zero components.
pub fn format(duration: Duration) -> String {
    let total = duration.as_secs();
    let (days, rest) = (total / SECONDS_PER_DAY, total % SECONDS_PER_DAY);
    let (hours, minutes, seconds) = (rest / 3600, rest % 3600 / 60, rest % 60);
    let nanos = duration.subsec_nanos();

    if total == 0 && nanos == 0 {
        return "PT0S".to_string();
    }

    let mut out = String::from("P");
    if days > 0 {
        let _ = write!(out, "{days}D");
    }
    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 {
        out.push('T');
    }
    if hours > 0 {
        let _ = write!(out, "{hours}H");
    }
    if minutes > 0 {
        let _ = write!(out, "{minutes}M");
    }
    if seconds > 0 || nanos > 0 {
        let _ = write!(out, "{seconds}");
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            let _ = write!(out, ".{}", fraction.trim_end_matches('0'));
        }
        out.push('S');
    }

    out
}

/// Parses an ISO-8601 duration (days and time components only) or the legacy
/// `d.hh:mm:ss.fffffff` form.
pub fn parse(text: &str) -> Result<Duration, DurationParseError> {
    let invalid = || DurationParseError(text.to_string());

    let (days, hours, minutes, seconds, fraction) = if let Some(caps) = ISO_REGEX.captures(text) {
        if text == "P" || text.ends_with('T') {
            return Err(invalid());
        }
        (caps.get(1), caps.get(2), caps.get(3), caps.get(4), caps.get(5))
    } else if let Some(caps) = LEGACY_REGEX.captures(text) {
        (caps.get(1), caps.get(2), caps.get(3), caps.get(4), caps.get(5))
    } else {
        return Err(invalid());
    };

    let number = |m: Option<regex::Match<'_>>| -> Result<u64, DurationParseError> {
        m.map_or(Ok(0), |m| m.as_str().parse().map_err(|_| invalid()))
    };

    let secs = number(days)?
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|s| s.checked_add(number(hours).ok()?.checked_mul(3600)?))
        .and_then(|s| s.checked_add(number(minutes).ok()?.checked_mul(60)?))
        .and_then(|s| s.checked_add(number(seconds).ok()?))
        .ok_or_else(invalid)?;

    let nanos = match fraction {
        Some(m) => format!("{:0<9}", m.as_str()).parse().map_err(|_| invalid())?,
        None => 0,
    };

    Ok(Duration::new(secs, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dhms(days: u64, hours: u64, minutes: u64, seconds: u64, millis: u64) -> Duration {
        Duration::from_secs(days * SECONDS_PER_DAY + hours * 3600 + minutes * 60 + seconds)
            + Duration::from_millis(millis)
    }

    #[test]
    fn formats_all_components() {
        assert_eq!(format(dhms(1, 12, 33, 12, 555)), "P1DT12H33M12.555S");
    }

    #[test]
    fn formats_omit_zero_components() {
        assert_eq!(format(Duration::ZERO), "PT0S");
        assert_eq!(format(dhms(2, 0, 0, 0, 0)), "P2D");
        assert_eq!(format(dhms(0, 0, 5, 0, 0)), "PT5M");
        assert_eq!(format(Duration::from_millis(1)), "PT0.001S");
        assert_eq!(format(Duration::from_nanos(1)), "PT0.000000001S");
    }

    #[test]
    fn parses_iso_durations() {
        assert_eq!(parse("P1DT12H33M12.555S"), Ok(dhms(1, 12, 33, 12, 555)));
        assert_eq!(parse("PT0S"), Ok(Duration::ZERO));
        assert_eq!(parse("P3D"), Ok(dhms(3, 0, 0, 0, 0)));
        assert_eq!(parse("PT90M"), Ok(dhms(0, 1, 30, 0, 0)));
        assert_eq!(parse("PT1,5S"), Ok(dhms(0, 0, 0, 1, 500)));
    }

    #[test]
    fn parses_the_legacy_form() {
        assert_eq!(parse("1.12:33:12.5550000"), Ok(dhms(1, 12, 33, 12, 555)));
        assert_eq!(parse("00:00:30"), Ok(dhms(0, 0, 0, 30, 0)));
    }

    #[test]
    fn rejects_malformed_input() {
        for text in ["", "P", "PT", "P1DT", "1D", "PT1.5H", "12:3:00", "-PT1S"] {
            assert!(parse(text).is_err(), "{text} should not parse");
        }
    }

    #[test]
    fn rejects_overflowing_input() {
        assert!(parse("P999999999999999999D").is_err());
    }

    #[test]
    fn formatted_durations_parse_back() {
        for duration in [
            Duration::ZERO,
            dhms(1, 12, 33, 12, 555),
            dhms(0, 23, 59, 59, 999),
            Duration::new(98_765, 123_456_789),
        ] {
            assert_eq!(parse(&format(duration)), Ok(duration));
        }
    }
}
