use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Local, Months, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` identifier of one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a YYYY-MM-DD day key")]
pub struct DayKeyError(pub String);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Only the zero-padded form is accepted, so every key formats back to
    /// exactly the text it was parsed from.
    pub fn parse(raw: &str) -> Result<Self, DayKeyError> {
        let invalid = || DayKeyError(raw.to_string());
        if raw.len() != 10 {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(raw, DAY_KEY_FORMAT).map_err(|_| invalid())?;
        let key = Self(date);
        if key.to_string() != raw {
            return Err(invalid());
        }
        Ok(key)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn prev(self) -> Self {
        self.add_days(-1)
    }

    pub fn next(self) -> Self {
        self.add_days(1)
    }

    pub fn add_days(self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Monday of the week containing this day.
    pub fn start_of_week(self) -> Self {
        let offset = self.0.weekday().num_days_from_monday();
        self.add_days(-i64::from(offset))
    }

    pub fn week(self) -> [DayKey; 7] {
        let start = self.start_of_week();
        std::array::from_fn(|idx| start.add_days(idx as i64))
    }

    /// Inclusive walk from `self` to `end`; empty when `end` is earlier.
    pub fn days_through(self, end: DayKey) -> impl Iterator<Item = DayKey> {
        let span = (end.0 - self.0).num_days();
        (0..=span).map(move |offset| self.add_days(offset))
    }

    pub fn short_weekday(self) -> String {
        self.0.format("%a").to_string().to_uppercase()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = DayKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DayKey::parse(&raw).map_err(de::Error::custom)
    }
}

/// Year and month shown `offset` months away from `today`.
pub fn shift_month(today: DayKey, offset: i32) -> (i32, u32) {
    let first = today.0.with_day(1).unwrap_or(today.0);
    let shifted = if offset >= 0 {
        first.checked_add_months(Months::new(offset.unsigned_abs()))
    } else {
        first.checked_sub_months(Months::new(offset.unsigned_abs()))
    };
    let shifted = shifted.unwrap_or(first);
    (shifted.year(), shifted.month())
}

/// Every day of the given month, in order. Empty for an invalid month.
pub fn month_days(year: i32, month: u32) -> Vec<DayKey> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|date| date.month() == month)
        .map(DayKey)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> DayKey {
        DayKey::parse(raw).expect("valid day key")
    }

    #[test]
    fn parses_and_formats_round_trip() {
        let parsed = key("2025-03-07");
        assert_eq!(parsed.to_string(), "2025-03-07");
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
    }

    #[test]
    fn rejects_unpadded_and_malformed_keys() {
        assert!(DayKey::parse("2025-3-7").is_err());
        assert!(DayKey::parse("2025-02-30").is_err());
        assert!(DayKey::parse("20250307").is_err());
        assert!(DayKey::parse("not a day!").is_err());
        assert!(DayKey::parse("").is_err());
    }

    #[test]
    fn arithmetic_crosses_month_and_year_boundaries() {
        assert_eq!(key("2025-01-01").prev(), key("2024-12-31"));
        assert_eq!(key("2024-02-28").next(), key("2024-02-29"));
        assert_eq!(key("2025-03-01").add_days(-1), key("2025-02-28"));
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-10-23 is a Thursday.
        let week = key("2025-10-23").week();
        assert_eq!(week[0], key("2025-10-20"));
        assert_eq!(week[6], key("2025-10-26"));
        assert_eq!(key("2025-10-20").start_of_week(), key("2025-10-20"));
        assert_eq!(key("2025-10-26").start_of_week(), key("2025-10-20"));
    }

    #[test]
    fn days_through_is_inclusive() {
        let days: Vec<_> = key("2025-12-30").days_through(key("2026-01-02")).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[3], key("2026-01-02"));
        assert_eq!(key("2025-01-02").days_through(key("2025-01-01")).count(), 0);
    }

    #[test]
    fn month_helpers() {
        assert_eq!(month_days(2024, 2).len(), 29);
        assert!(month_days(2024, 13).is_empty());
        assert_eq!(shift_month(key("2025-01-31"), -1), (2024, 12));
        assert_eq!(shift_month(key("2025-11-15"), 3), (2026, 2));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&key("2025-10-05")).unwrap();
        assert_eq!(json, "\"2025-10-05\"");
        let back: DayKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key("2025-10-05"));
        assert!(serde_json::from_str::<DayKey>("\"2025-1-5\"").is_err());
    }
}
