//! Normalization of vendor date text into instants.
//!
//! Strategies run in a fixed order and each either produces an instant or
//! declines. When every strategy declines the result is `None`, which callers
//! persist as an unparsed due date instead of guessing.

use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _,
    Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::formats::DueDate;

static VENDOR_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2})\s+([a-z]+)\s+(\d{4}),?\s*(\d{1,2}):(\d{2})\s*(AM|PM)?")
        .expect("vendor date regex")
});

static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(AM|PM)?").expect("time of day regex"));

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Epoch,
    Native,
    Vendor,
    Relative,
}

pub const STRATEGIES: [Strategy; 4] = [
    Strategy::Epoch,
    Strategy::Native,
    Strategy::Vendor,
    Strategy::Relative,
];

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Epoch => "epoch",
            Self::Native => "native",
            Self::Vendor => "vendor",
            Self::Relative => "relative",
        }
    }

    pub fn parse(self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Epoch => parse_epoch(text),
            Self::Native => parse_native(text),
            Self::Vendor => parse_vendor(text),
            Self::Relative => parse_relative(text, now),
        }
    }
}

pub fn normalize_due_text(text: &str, now: DateTime<Utc>) -> DueDate {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for strategy in STRATEGIES {
        if let Some(instant) = strategy.parse(text, now) {
            tracing::trace!(strategy = strategy.name(), text, %instant, "parsed due date");
            return Some(instant);
        }
    }
    tracing::debug!(text, "due date text not recognized");
    None
}

pub fn from_epoch_seconds(seconds: i64) -> DueDate {
    DateTime::<Utc>::from_timestamp(seconds, 0)
}

/// Shorter digit runs are years or day numbers, not epoch seconds.
const MIN_EPOCH_DIGITS: usize = 9;

fn parse_epoch(text: &str) -> Option<DateTime<Utc>> {
    if text.len() < MIN_EPOCH_DIGITS || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    from_epoch_seconds(text.parse::<i64>().ok()?)
}

fn parse_native(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local_to_utc(naive);
        }
    }
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = text.parse().ok()?;
        return Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    local_to_utc(date.and_time(NaiveTime::MIN))
}

fn parse_vendor(text: &str) -> Option<DateTime<Utc>> {
    let caps = VENDOR_DATE_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    let hour = to_24_hour(caps[4].parse().ok()?, caps.get(6).map(|m| m.as_str()));
    let minute: u32 = caps[5].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    local_to_utc(date.and_time(time))
}

fn parse_relative(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = text.to_ascii_lowercase();
    let offset_days = if lower.contains("today") {
        0
    } else if lower.contains("tomorrow") {
        1
    } else {
        return None;
    };

    let local_now = now.with_timezone(&Local);
    let day = local_now.date_naive() + Duration::days(offset_days);
    let Some(caps) = TIME_OF_DAY_RE.captures(text) else {
        return Some(now + Duration::days(offset_days));
    };
    let hour = to_24_hour(caps[1].parse().ok()?, caps.get(3).map(|m| m.as_str()));
    let minute: u32 = caps[2].parse().ok()?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    local_to_utc(day.and_time(time))
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|month| *month == name || (name.len() == 3 && month.starts_with(&name)))
        .map(|index| index as u32 + 1)
}

fn to_24_hour(hour: u32, meridiem: Option<&str>) -> u32 {
    match meridiem.map(str::to_ascii_uppercase).as_deref() {
        Some("PM") if hour != 12 => hour + 12,
        Some("AM") if hour == 12 => 0,
        _ => hour,
    }
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn fixed_now() -> DateTime<Utc> {
        local(2024, 12, 20, 9, 15)
    }

    #[test]
    fn vendor_format_builds_local_instant() {
        let now = fixed_now();
        assert_eq!(
            normalize_due_text("25 December 2024, 3:30 PM", now),
            Some(local(2024, 12, 25, 15, 30))
        );
        assert_eq!(
            normalize_due_text("Wednesday, 1 January 2025, 12:05 AM", now),
            Some(local(2025, 1, 1, 0, 5))
        );
        assert_eq!(
            normalize_due_text("3 Mar 2025 12:00 PM", now),
            Some(local(2025, 3, 3, 12, 0))
        );
        assert_eq!(
            normalize_due_text("14 February 2025, 23:59", now),
            Some(local(2025, 2, 14, 23, 59))
        );
    }

    #[test]
    fn unknown_month_falls_through_to_unparsed() {
        assert_eq!(normalize_due_text("25 Smarch 2024, 3:30 PM", fixed_now()), None);
    }

    #[test]
    fn native_formats() {
        let now = fixed_now();
        assert_eq!(
            normalize_due_text("2024-12-25T07:30:00Z", now),
            Some(Utc.with_ymd_and_hms(2024, 12, 25, 7, 30, 0).unwrap())
        );
        assert_eq!(
            normalize_due_text("Wed, 25 Dec 2024 07:30:00 +0000", now),
            Some(Utc.with_ymd_and_hms(2024, 12, 25, 7, 30, 0).unwrap())
        );
        assert_eq!(
            normalize_due_text("2024-12-25 15:30", now),
            Some(local(2024, 12, 25, 15, 30))
        );
        assert_eq!(
            normalize_due_text("2024-12-25", now),
            Some(local(2024, 12, 25, 0, 0))
        );
    }

    #[test]
    fn epoch_seconds() {
        assert_eq!(
            normalize_due_text("1735111800", fixed_now()),
            Some(Utc.with_ymd_and_hms(2024, 12, 25, 7, 30, 0).unwrap())
        );
    }

    #[test]
    fn short_digit_runs_are_not_epoch_seconds() {
        assert_eq!(
            normalize_due_text("2025", fixed_now()),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(Strategy::Epoch.parse("12345678", fixed_now()), None);
        assert_eq!(normalize_due_text("42", fixed_now()), None);
        assert_eq!(
            Strategy::Epoch.parse("100000000", fixed_now()),
            Some(Utc.with_ymd_and_hms(1973, 3, 3, 9, 46, 40).unwrap())
        );
    }

    #[test]
    fn relative_words_use_time_of_day() {
        let now = fixed_now();
        assert_eq!(
            normalize_due_text("Today, 11:59 PM", now),
            Some(local(2024, 12, 20, 23, 59))
        );
        assert_eq!(
            normalize_due_text("Tomorrow, 8:00 AM", now),
            Some(local(2024, 12, 21, 8, 0))
        );
    }

    #[test]
    fn relative_words_without_time_keep_current_time() {
        let now = fixed_now();
        assert_eq!(normalize_due_text("due today", now), Some(now));
        assert_eq!(
            normalize_due_text("Tomorrow", now),
            Some(now + Duration::days(1))
        );
    }

    #[test]
    fn garbage_is_unparsed_not_now() {
        let now = fixed_now();
        assert_eq!(normalize_due_text("whenever you like", now), None);
        assert_eq!(normalize_due_text("   ", now), None);
    }

    #[test]
    fn twelve_hour_edges() {
        assert_eq!(to_24_hour(12, Some("pm")), 12);
        assert_eq!(to_24_hour(12, Some("AM")), 0);
        assert_eq!(to_24_hour(1, Some("PM")), 13);
        assert_eq!(to_24_hour(9, None), 9);
    }
}
