//! Timeline geometry: dates to horizontal positions and back.
//!
//! # Invariants
//! - The window covers whole months, inclusive on both ends.
//! - `total_days()` is never below 1, so every division is defined.
//! - Positions are percentages of the track width.

use crate::model::dates::{add_days, add_months, month_end, month_start, DateRange};
use chrono::NaiveDate;

/// Horizontal placement of one bar, in percent of the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarPosition {
    pub left_pct: f64,
    pub width_pct: f64,
}

/// Header cell for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthColumn {
    pub month: NaiveDate,
    pub label: String,
    pub left_pct: f64,
    pub width_pct: f64,
}

/// Visible date window of the roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineWindow {
    range: DateRange,
}

impl TimelineWindow {
    /// Window from the first day of `first` month to the last day of `last`.
    ///
    /// Months given in reverse order are swapped.
    pub fn months(first: NaiveDate, last: NaiveDate) -> Self {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        Self {
            range: DateRange::spanning(month_start(first), month_end(last)),
        }
    }

    /// Window covering `count` months starting at the month of `first`.
    pub fn from_month_count(first: NaiveDate, count: u32) -> Self {
        let span = i32::try_from(count.max(1) - 1).unwrap_or(0);
        let last = add_months(month_start(first), span).unwrap_or(first);
        Self::months(first, last)
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn start(&self) -> NaiveDate {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end()
    }

    pub fn total_days(&self) -> i64 {
        self.range.len_days().max(1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.range.contains(date)
    }

    pub fn clamp_date(&self, date: NaiveDate) -> NaiveDate {
        date.max(self.start()).min(self.end())
    }

    /// Places `range` on the track, clipped to the window.
    ///
    /// Returns `None` when the range lies completely outside the window.
    pub fn bar_position(&self, range: &DateRange, min_visible_width_pct: f64) -> Option<BarPosition> {
        let visible = range.intersect(&self.range)?;
        let total = self.total_days() as f64;
        let days_from_start = (visible.start() - self.start()).num_days() as f64;
        let duration = visible.len_days() as f64;
        Some(BarPosition {
            left_pct: days_from_start / total * 100.0,
            width_pct: (duration / total * 100.0).max(min_visible_width_pct),
        })
    }

    pub fn pixels_per_day(&self, track_width_px: f64) -> f64 {
        if track_width_px <= 0.0 {
            return 0.0;
        }
        track_width_px / self.total_days() as f64
    }

    /// Date under horizontal track coordinate `x_px`, clamped to the window.
    pub fn date_at(&self, x_px: f64, track_width_px: f64) -> NaiveDate {
        let days = day_offset(x_px, self.pixels_per_day(track_width_px));
        self.clamp_date(add_days(self.start(), days))
    }

    /// One header column per calendar month in the window.
    pub fn month_columns(&self) -> Vec<MonthColumn> {
        let mut columns = Vec::new();
        let mut cursor = self.start();
        while cursor <= self.end() {
            let month = DateRange::spanning(cursor, month_end(cursor).min(self.end()));
            if let Some(position) = self.bar_position(&month, 0.0) {
                columns.push(MonthColumn {
                    month: cursor,
                    label: cursor.format("%b %Y").to_string(),
                    left_pct: position.left_pct,
                    width_pct: position.width_pct,
                });
            }
            match add_months(cursor, 1) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        columns
    }
}

/// Converts a pointer delta to whole days (day-level snap, rounded).
pub fn day_offset(delta_px: f64, pixels_per_day: f64) -> i64 {
    if pixels_per_day <= 0.0 || !delta_px.is_finite() {
        return 0;
    }
    (delta_px / pixels_per_day).round() as i64
}

#[cfg(test)]
mod tests {
    use super::{day_offset, TimelineWindow};
    use crate::model::dates::DateRange;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_spans_whole_months() {
        let window = TimelineWindow::months(d(2024, 1, 15), d(2024, 3, 2));
        assert_eq!(window.start(), d(2024, 1, 1));
        assert_eq!(window.end(), d(2024, 3, 31));
        assert_eq!(window.total_days(), 91);
    }

    #[test]
    fn bar_position_uses_day_ratio() {
        // 2023-04 has 30 days, so every day is 1/30 of the track.
        let window = TimelineWindow::months(d(2023, 4, 1), d(2023, 4, 1));
        let range = DateRange::new(d(2023, 4, 4), d(2023, 4, 6)).unwrap();
        let bar = window.bar_position(&range, 0.5).unwrap();
        assert!((bar.left_pct - 10.0).abs() < 1e-9);
        assert!((bar.width_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn bar_position_applies_minimum_width_and_clipping() {
        let window = TimelineWindow::from_month_count(d(2024, 1, 1), 12);
        let single_day = DateRange::new(d(2024, 6, 1), d(2024, 6, 1)).unwrap();
        let bar = window.bar_position(&single_day, 1.0).unwrap();
        assert_eq!(bar.width_pct, 1.0);

        let before = DateRange::new(d(2023, 1, 1), d(2023, 2, 1)).unwrap();
        assert!(window.bar_position(&before, 1.0).is_none());

        let straddling = DateRange::new(d(2023, 12, 1), d(2024, 1, 10)).unwrap();
        assert_eq!(window.bar_position(&straddling, 0.0).unwrap().left_pct, 0.0);
    }

    #[test]
    fn day_offset_rounds_and_guards_zero_scale() {
        assert_eq!(day_offset(49.0, 10.0), 5);
        assert_eq!(day_offset(-26.0, 10.0), -3);
        assert_eq!(day_offset(100.0, 0.0), 0);
    }

    #[test]
    fn month_columns_cover_track() {
        let window = TimelineWindow::months(d(2024, 1, 1), d(2024, 3, 1));
        let columns = window.month_columns();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].label, "Jan 2024");
        let total: f64 = columns.iter().map(|column| column.width_pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn date_at_clamps_to_window() {
        let window = TimelineWindow::months(d(2024, 1, 1), d(2024, 1, 1));
        assert_eq!(window.date_at(-50.0, 310.0), d(2024, 1, 1));
        assert_eq!(window.date_at(50.0, 310.0), d(2024, 1, 6));
        assert_eq!(window.date_at(5000.0, 310.0), d(2024, 1, 31));
    }
}
