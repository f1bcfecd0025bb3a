//! Time normalization: operator wall-clock timestamps to UTC instants.
//!
//! Resolution order for a single timestamp:
//! 1. an explicit offset in the text (RFC 3339 offset or a trailing zone
//!    abbreviation such as `CDT`) is used as-is;
//! 2. otherwise the text is read as wall-clock time in the operator timezone,
//!    and a caller-supplied [`DstHint`] picks between the two instants of a
//!    repeated hour, or the offset used inside a spring-forward gap;
//! 3. without a hint, repeated hours resolve to standard time (the later
//!    instant) and gap times are read with the standard offset.

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::{OffsetComponents, Tz};
use thiserror::Error;
use tracing::trace;

/// Naive datetime layouts tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%b %d %Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%b-%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// North American zone abbreviations operators print after their timestamps.
const ZONE_ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

/// Which side of a daylight-saving transition a local time belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstHint {
    Daylight,
    Standard,
}

/// A timestamp as an operator document expresses it, before timezone resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampSpec {
    /// Free-text datetime, e.g. `Sep 15 2014 13:50:20 CDT` or `05/03/2014 02:00`.
    Text { text: String, dst: Option<DstHint> },
    /// Delivery date plus hour-ending (1..=24); resolves to the start of the hour.
    HourEnding {
        date: String,
        hour_ending: String,
        dst: Option<DstHint>,
    },
    /// Delivery date plus the clock time an interval begins at.
    IntervalStart {
        date: String,
        time: String,
        dst: Option<DstHint>,
    },
}

impl TimestampSpec {
    pub fn text(text: impl Into<String>) -> Self {
        TimestampSpec::Text {
            text: text.into(),
            dst: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized timestamp '{input}': {reason}")]
pub struct TimestampError {
    pub input: String,
    pub reason: String,
}

impl TimestampError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Converts operator-local timestamps into UTC. Pure and `Copy`; safe to share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    tz: Tz,
}

impl TimeNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn utcify(&self, spec: &TimestampSpec) -> Result<DateTime<Utc>, TimestampError> {
        match spec {
            TimestampSpec::Text { text, dst } => self.utcify_text(text, *dst),
            TimestampSpec::HourEnding {
                date,
                hour_ending,
                dst,
            } => {
                let day = parse_date(date)?;
                let he = parse_hour_ending(hour_ending)?;
                let start = day.and_time(NaiveTime::MIN) + Duration::hours(i64::from(he) - 1);
                Ok(self.localize(start, *dst))
            }
            TimestampSpec::IntervalStart { date, time, dst } => {
                let day = parse_date(date)?;
                let clock = parse_clock(time)?;
                Ok(self.localize(day.and_time(clock), *dst))
            }
        }
    }

    /// Convenience for free text without a DST hint.
    pub fn utcify_str(&self, text: &str) -> Result<DateTime<Utc>, TimestampError> {
        self.utcify_text(text, None)
    }

    fn utcify_text(&self, raw: &str, dst: Option<DstHint>) -> Result<DateTime<Utc>, TimestampError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(TimestampError::new(raw, "empty"));
        }

        if let Some(dt) = parse_with_offset(text) {
            return Ok(dt);
        }

        if let Some((head, tail)) = text.rsplit_once(char::is_whitespace) {
            if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphabetic()) {
                let hours = zone_offset_hours(tail)
                    .ok_or_else(|| TimestampError::new(raw, format!("unknown zone abbreviation '{}'", tail)))?;
                let naive = parse_naive(head.trim()).ok_or_else(|| TimestampError::new(raw, "no matching format"))?;
                let offset = FixedOffset::east_opt(hours * 3600)
                    .ok_or_else(|| TimestampError::new(raw, "offset out of range"))?;
                return offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok_or_else(|| TimestampError::new(raw, "offset out of range"));
            }
        }

        let naive = parse_naive(text).ok_or_else(|| TimestampError::new(raw, "no matching format"))?;
        Ok(self.localize(naive, dst))
    }

    /// Resolve a wall-clock time in the operator timezone. Never fails: the
    /// ambiguity and gap rules always pick exactly one instant.
    pub fn localize(&self, naive: NaiveDateTime, dst: Option<DstHint>) -> DateTime<Utc> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(a, b) => {
                let want_daylight = dst == Some(DstHint::Daylight);
                let picked = [a, b]
                    .into_iter()
                    .find(|dt| is_daylight(dt) == want_daylight)
                    .unwrap_or(if a > b { a } else { b });
                trace!(%naive, ?dst, picked = %picked, "resolved repeated local hour");
                picked.with_timezone(&Utc)
            }
            LocalResult::None => {
                // Offsets a day either side of the gap bracket the transition.
                let before = self.tz.offset_from_utc_datetime(&(naive - Duration::days(1)));
                let after = self.tz.offset_from_utc_datetime(&(naive + Duration::days(1)));
                let (standard, daylight) = if before.dst_offset() == Duration::zero() {
                    (before.fix(), after.fix())
                } else {
                    (after.fix(), before.fix())
                };
                let offset = match dst {
                    Some(DstHint::Daylight) => daylight,
                    _ => standard,
                };
                trace!(%naive, ?dst, %offset, "resolved local time inside DST gap");
                let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
                Utc.from_utc_datetime(&utc)
            }
        }
    }
}

fn is_daylight(dt: &DateTime<Tz>) -> bool {
    dt.offset().dst_offset() != Duration::zero()
}

fn zone_offset_hours(abbrev: &str) -> Option<i32> {
    ZONE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(abbrev))
        .map(|(_, hours)| *hours)
}

fn parse_with_offset(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"]
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn parse_date(text: &str) -> Result<NaiveDate, TimestampError> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimestampError::new(text, "unrecognized date"))
}

/// `"01:00"`, `"1"` and `"24:00"` style hour-ending values.
fn parse_hour_ending(text: &str) -> Result<u32, TimestampError> {
    let trimmed = text.trim();
    let (hours, minutes) = match trimmed.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (trimmed, None),
    };
    if let Some(m) = minutes {
        if m.parse::<u32>().ok() != Some(0) {
            return Err(TimestampError::new(text, "hour-ending must fall on the hour"));
        }
    }
    match hours.parse::<u32>() {
        Ok(he) if (1..=24).contains(&he) => Ok(he),
        _ => Err(TimestampError::new(text, "hour-ending outside 1..=24")),
    }
}

fn parse_clock(text: &str) -> Result<NaiveTime, TimestampError> {
    let trimmed = text.trim();
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimestampError::new(text, "unrecognized clock time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn central() -> TimeNormalizer {
        TimeNormalizer::new(chrono_tz::America::Chicago)
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_utcify_slash_format_in_daylight_time() {
        let ts = central().utcify_str("05/03/2014 02:00").unwrap();
        assert_eq!(ts.year(), 2014);
        assert_eq!(ts.month(), 5);
        assert_eq!(ts.day(), 3);
        assert_eq!(ts.hour(), 2 + 5);
        assert_eq!(ts.minute(), 0);
    }

    #[test]
    fn test_utcify_fixed_eastern_standard_zone() {
        let tn = TimeNormalizer::new(chrono_tz::Etc::GMTPlus5);
        let ts = tn.utcify_str("2014-05-03T01:45:00").unwrap();
        assert_eq!(ts, utc(2014, 5, 3, 6, 45, 0));
    }

    #[test]
    fn test_trailing_abbreviation_wins_over_operator_zone() {
        let ts = central().utcify_str("Sep 15 2014 13:50:20 CDT").unwrap();
        assert_eq!(ts, utc(2014, 9, 15, 18, 50, 20));

        // Same wall clock, explicitly standard time: one hour later in UTC.
        let ts = central().utcify_str("Sep 15 2014 13:50:20 CST").unwrap();
        assert_eq!(ts, utc(2014, 9, 15, 19, 50, 20));
    }

    #[test]
    fn test_utcify_is_idempotent_on_its_output() {
        let tn = central();
        for text in ["Sep 15 2014 13:50:20 CDT", "05/03/2014 02:00", "11/02/2014 01:30", "2014-03-09 02:30"] {
            let once = tn.utcify_str(text).unwrap();
            let twice = tn.utcify_str(&once.to_rfc3339()).unwrap();
            assert_eq!(once, twice, "{}", text);
            let z = tn.utcify_str(&once.format("%Y-%m-%dT%H:%M:%SZ").to_string()).unwrap();
            assert_eq!(once, z);
        }
    }

    #[test]
    fn test_repeated_hour_defaults_to_standard_time() {
        let tn = central();
        assert_eq!(tn.utcify_str("11/02/2014 01:30").unwrap(), utc(2014, 11, 2, 7, 30, 0));

        let hinted = TimestampSpec::Text {
            text: "11/02/2014 01:30".into(),
            dst: Some(DstHint::Daylight),
        };
        assert_eq!(tn.utcify(&hinted).unwrap(), utc(2014, 11, 2, 6, 30, 0));
    }

    #[test]
    fn test_gap_time_uses_standard_offset_unless_hinted() {
        let tn = central();
        assert_eq!(tn.utcify_str("03/09/2014 02:30").unwrap(), utc(2014, 3, 9, 8, 30, 0));

        let hinted = TimestampSpec::Text {
            text: "03/09/2014 02:30".into(),
            dst: Some(DstHint::Daylight),
        };
        assert_eq!(tn.utcify(&hinted).unwrap(), utc(2014, 3, 9, 7, 30, 0));
    }

    #[test]
    fn test_hint_is_ignored_for_unambiguous_times() {
        let spec = TimestampSpec::Text {
            text: "05/03/2014 02:00".into(),
            dst: Some(DstHint::Standard),
        };
        assert_eq!(central().utcify(&spec).unwrap(), utc(2014, 5, 3, 7, 0, 0));
    }

    #[test]
    fn test_hour_ending_resolves_to_interval_start() {
        let tn = central();
        let first = TimestampSpec::HourEnding {
            date: "09/15/2014".into(),
            hour_ending: "01:00".into(),
            dst: None,
        };
        assert_eq!(tn.utcify(&first).unwrap(), utc(2014, 9, 15, 5, 0, 0));

        let last = TimestampSpec::HourEnding {
            date: "09/15/2014".into(),
            hour_ending: "24:00".into(),
            dst: None,
        };
        assert_eq!(tn.utcify(&last).unwrap(), utc(2014, 9, 16, 4, 0, 0));
    }

    #[test]
    fn test_hour_ending_repeated_hour_follows_hint() {
        let tn = central();
        let spec = |dst| TimestampSpec::HourEnding {
            date: "11/02/2014".into(),
            hour_ending: "02:00".into(),
            dst,
        };
        assert_eq!(tn.utcify(&spec(Some(DstHint::Daylight))).unwrap(), utc(2014, 11, 2, 6, 0, 0));
        assert_eq!(tn.utcify(&spec(Some(DstHint::Standard))).unwrap(), utc(2014, 11, 2, 7, 0, 0));
    }

    #[test]
    fn test_interval_start() {
        let spec = TimestampSpec::IntervalStart {
            date: "2014-09-15".into(),
            time: "13:45".into(),
            dst: None,
        };
        assert_eq!(central().utcify(&spec).unwrap(), utc(2014, 9, 15, 18, 45, 0));
    }

    #[test]
    fn test_unrecognized_text_is_an_error() {
        let tn = central();
        assert!(tn.utcify_str("").is_err());
        assert!(tn.utcify_str("yesterday afternoon").is_err());
        assert!(tn.utcify_str("Sep 15 2014 13:50:20 XYZ").is_err());

        let bad_hour = TimestampSpec::HourEnding {
            date: "09/15/2014".into(),
            hour_ending: "25".into(),
            dst: None,
        };
        assert!(tn.utcify(&bad_hour).is_err());
    }
}
