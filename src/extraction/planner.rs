//! Decides which date ranges to request for a station, given its watermark.

use crate::config::ExtractionSettings;
use chrono::{Duration, NaiveDate};
use std::fmt;

/// Inclusive date range requested from the provider in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days covered, endpoints included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowPlan {
    /// The station already has data up to today.
    UpToDate,
    Windows(Vec<DateWindow>),
}

impl WindowPlan {
    pub fn windows(&self) -> &[DateWindow] {
        match self {
            WindowPlan::UpToDate => &[],
            WindowPlan::Windows(w) => w,
        }
    }
}

/// Cold-start stations get the whole lookback horizon in fixed-size windows;
/// warm stations get a single window from the day after their watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    lookback_days: i64,
    window_days: i64,
}

impl Default for WindowPlanner {
    fn default() -> Self {
        Self::new(730, 180)
    }
}

impl From<&ExtractionSettings> for WindowPlanner {
    fn from(settings: &ExtractionSettings) -> Self {
        Self::new(settings.lookback_days, settings.window_days)
    }
}

impl WindowPlanner {
    /// `window_days` is clamped to at least one day, `lookback_days` to zero.
    pub fn new(lookback_days: i64, window_days: i64) -> Self {
        Self {
            lookback_days: lookback_days.max(0),
            window_days: window_days.max(1),
        }
    }

    pub fn plan(&self, today: NaiveDate, watermark: Option<NaiveDate>) -> WindowPlan {
        match watermark {
            Some(last) if last >= today => WindowPlan::UpToDate,
            Some(last) => WindowPlan::Windows(vec![DateWindow::new(
                last + Duration::days(1),
                today,
            )]),
            None => WindowPlan::Windows(self.cold_start(today)),
        }
    }

    fn cold_start(&self, today: NaiveDate) -> Vec<DateWindow> {
        let mut windows = Vec::new();
        let mut start = today - Duration::days(self.lookback_days);
        while start <= today {
            let end = (start + Duration::days(self.window_days - 1)).min(today);
            windows.push(DateWindow::new(start, end));
            start = end + Duration::days(1);
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_up_to_date_stations_are_skipped() {
        let planner = WindowPlanner::default();
        let today = date(2025, 3, 10);
        assert_eq!(planner.plan(today, Some(today)), WindowPlan::UpToDate);
        assert_eq!(planner.plan(today, Some(date(2025, 4, 1))), WindowPlan::UpToDate);
        assert!(planner.plan(today, Some(today)).windows().is_empty());
    }

    #[test]
    fn test_warm_start_single_window() {
        let planner = WindowPlanner::default();
        let today = date(2025, 3, 10);
        let plan = planner.plan(today, Some(date(2025, 3, 1)));
        assert_eq!(
            plan,
            WindowPlan::Windows(vec![DateWindow::new(date(2025, 3, 2), today)])
        );

        let plan = planner.plan(today, Some(date(2025, 3, 9)));
        assert_eq!(plan.windows(), &[DateWindow::new(today, today)]);
    }

    #[test]
    fn test_cold_start_covers_lookback_exactly() {
        let today = date(2025, 3, 10);
        for (lookback, size) in [(730, 180), (730, 182), (10, 3), (0, 5), (30, 1), (5, 100)] {
            let planner = WindowPlanner::new(lookback, size);
            let plan = planner.plan(today, None);
            let windows = plan.windows();

            assert!(!windows.is_empty());
            assert_eq!(windows[0].start, today - Duration::days(lookback));
            assert_eq!(windows[windows.len() - 1].end, today);
            for w in windows {
                assert!(w.start <= w.end);
                assert!(w.days() <= size);
            }
            for pair in windows.windows(2) {
                // Contiguous and non-overlapping
                assert_eq!(pair[1].start, pair[0].end + Duration::days(1));
            }
            let covered: i64 = windows.iter().map(DateWindow::days).sum();
            assert_eq!(covered, lookback + 1);
        }
    }

    #[test]
    fn test_window_contains() {
        let w = DateWindow::new(date(2024, 1, 1), date(2024, 1, 31));
        assert!(w.contains(date(2024, 1, 1)));
        assert!(w.contains(date(2024, 1, 31)));
        assert!(!w.contains(date(2024, 2, 1)));
        assert_eq!(w.days(), 31);
        assert_eq!(w.to_string(), "2024-01-01..=2024-01-31");
    }
}
