//! Calendar primitives and day classification.
//!
//! Defines month keys, inclusive date ranges and the [`DayClassifier`]
//! seam through which the external holiday calendar is consumed.
//!
//! # Classification Precedence
//! [`HolidayCalendar`] classifies a date as:
//! 1. `Special` if it is a listed special holiday, else
//! 2. `Weekend` if it is a Saturday, Sunday or listed holiday, else
//! 3. `Semi` if the following day is non-working, else
//! 4. `Normal`.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::DayCategory;
use crate::error::RotationError;

/// Maps a calendar date to its duty category.
///
/// Implemented by [`HolidayCalendar`] and by any
/// `Fn(NaiveDate) -> DayCategory` closure.
pub trait DayClassifier {
    /// Classifies a date.
    fn classify(&self, date: NaiveDate) -> DayCategory;
}

impl<F> DayClassifier for F
where
    F: Fn(NaiveDate) -> DayCategory,
{
    fn classify(&self, date: NaiveDate) -> DayCategory {
        self(date)
    }
}

/// Reference classifier built from explicit holiday lists.
///
/// Recurring-holiday rules and movable feasts are the caller's concern;
/// this type only answers for the dates it was given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    /// Special (major) holidays.
    pub special: BTreeSet<NaiveDate>,
    /// Ordinary public holidays, treated like weekend days.
    pub holidays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Creates a calendar with no holidays (weekends only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a special holiday.
    pub fn with_special(mut self, date: NaiveDate) -> Self {
        self.special.insert(date);
        self
    }

    /// Adds an ordinary holiday.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    /// Whether the date is a non-working day.
    pub fn is_non_working(&self, date: NaiveDate) -> bool {
        self.special.contains(&date)
            || self.holidays.contains(&date)
            || matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl DayClassifier for HolidayCalendar {
    fn classify(&self, date: NaiveDate) -> DayCategory {
        if self.special.contains(&date) {
            return DayCategory::Special;
        }
        if self.is_non_working(date) {
            return DayCategory::Weekend;
        }
        match date.succ_opt() {
            Some(next) if self.is_non_working(next) => DayCategory::Semi,
            _ => DayCategory::Normal,
        }
    }
}

/// A calendar month, stored as its first day.
///
/// Serializes as `"YYYY-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    /// Creates a month key, validating the month number.
    pub fn new(year: i32, month: u32) -> Result<Self, RotationError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| RotationError::InvalidMonthKey(format!("{year:04}-{month:02}")))
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }

    /// Calendar year.
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// Month number (1..=12).
    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// First day of the month.
    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    /// Last day of the month.
    pub fn last_day(self) -> NaiveDate {
        self.next().0 - Days::new(1)
    }

    /// The following month.
    pub fn next(self) -> Self {
        Self(self.0 + Months::new(1))
    }

    /// The preceding month.
    pub fn prev(self) -> Self {
        Self(self.0 - Months::new(1))
    }

    /// Whether `date` falls in this month.
    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }

    /// The whole month as a date range.
    pub fn range(self) -> DateRange {
        DateRange {
            start: self.first_day(),
            end: self.last_day(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for MonthKey {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RotationError::InvalidMonthKey(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An inclusive date range [start, end].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range; fails if `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RotationError> {
        if end < start {
            return Err(RotationError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A single-day range.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// First day (inclusive).
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies within the range.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterates every day in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Number of days in the range.
    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Months touched by the range, ascending.
    pub fn months(&self) -> Vec<MonthKey> {
        let mut months = Vec::new();
        let mut month = MonthKey::of(self.start);
        while month.first_day() <= self.end {
            months.push(month);
            month = month.next();
        }
        months
    }

    /// Overlap of two ranges.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        DateRange::new(start, end).ok()
    }

    /// The part of `month` that precedes this range, if any.
    pub fn lead_in(&self, month: MonthKey) -> Option<DateRange> {
        let end = self.start.pred_opt()?;
        DateRange::new(month.first_day(), end).ok()
    }
}
