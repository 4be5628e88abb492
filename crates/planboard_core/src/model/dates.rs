//! Calendar helpers shared by planning records and timeline layout.
//!
//! # Invariants
//! - `DateRange` is inclusive on both ends and never reversed.
//! - Month values are represented by their first day.

use super::ModelValidationError;
use chrono::{Datelike, Days, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateRangeWire")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct DateRangeWire {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<DateRangeWire> for DateRange {
    type Error = ModelValidationError;

    fn try_from(value: DateRangeWire) -> Result<Self, Self::Error> {
        Self::new(value.start, value.end)
    }
}

impl DateRange {
    /// Builds a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ModelValidationError> {
        if end < start {
            return Err(ModelValidationError::ReversedDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a range from two dates in either order.
    pub fn spanning(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Inclusive overlap test.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Moves both ends by `days`, keeping the duration.
    ///
    /// Ends saturate at chrono's supported date range.
    pub fn shift_days(&self, days: i64) -> Self {
        Self {
            start: add_days(self.start, days),
            end: add_days(self.end, days),
        }
    }

    /// Returns the part of `self` inside `bounds`, if any.
    pub fn intersect(&self, bounds: &DateRange) -> Option<DateRange> {
        if !self.overlaps(bounds) {
            return None;
        }
        Some(Self {
            start: self.start.max(bounds.start),
            end: self.end.min(bounds.end),
        })
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    match add_months(month_start(date), 1) {
        Some(next) => next - Duration::days(1),
        None => date,
    }
}

/// Adds (or with negative `days`, subtracts) whole days, saturating at
/// `NaiveDate::MIN` / `NaiveDate::MAX`.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let step = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(step).unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(step).unwrap_or(NaiveDate::MIN)
    }
}

/// Adds (or with negative `months`, subtracts) calendar months.
///
/// Day-of-month is clamped to the target month length. Returns `None` when
/// the result leaves chrono's supported range.
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Whether `date` is the first day of its month.
pub fn is_month_start(date: NaiveDate) -> bool {
    date.day() == 1
}

#[cfg(test)]
mod tests {
    use super::{add_days, add_months, month_end, month_start, DateRange};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_rejects_reversed_dates() {
        assert!(DateRange::new(d(2024, 3, 2), d(2024, 3, 1)).is_err());
        assert_eq!(DateRange::new(d(2024, 3, 1), d(2024, 3, 1)).unwrap().len_days(), 1);
    }

    #[test]
    fn month_helpers_handle_leap_february() {
        assert_eq!(month_start(d(2024, 2, 17)), d(2024, 2, 1));
        assert_eq!(month_end(d(2024, 2, 17)), d(2024, 2, 29));
        assert_eq!(add_months(d(2024, 3, 1), -1), Some(d(2024, 2, 1)));
        assert_eq!(add_months(d(2024, 1, 31), 1), Some(d(2024, 2, 29)));
    }

    #[test]
    fn day_arithmetic_saturates_at_calendar_limits() {
        assert_eq!(add_days(d(2024, 2, 28), 2), d(2024, 3, 1));
        assert_eq!(add_days(d(2024, 3, 1), -1), d(2024, 2, 29));
        assert_eq!(add_days(NaiveDate::MAX, 1), NaiveDate::MAX);
        assert_eq!(add_days(NaiveDate::MIN, i64::MIN), NaiveDate::MIN);

        let last = DateRange::new(d(2024, 1, 1), NaiveDate::MAX).unwrap();
        let shifted = last.shift_days(10);
        assert_eq!(shifted.start(), d(2024, 1, 11));
        assert_eq!(shifted.end(), NaiveDate::MAX);
    }

    #[test]
    fn intersect_clips_to_bounds() {
        let bounds = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let range = DateRange::new(d(2023, 12, 20), d(2024, 1, 5)).unwrap();
        let clipped = range.intersect(&bounds).unwrap();
        assert_eq!(clipped.start(), d(2024, 1, 1));
        assert_eq!(clipped.end(), d(2024, 1, 5));

        let outside = DateRange::new(d(2024, 2, 1), d(2024, 2, 2)).unwrap();
        assert!(outside.intersect(&bounds).is_none());
    }

    #[test]
    fn deserialize_rejects_reversed_range() {
        let err = serde_json::from_str::<DateRange>(r#"{"start":"2024-02-02","end":"2024-02-01"}"#);
        assert!(err.is_err());
    }
}
