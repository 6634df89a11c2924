//! Seven-day deadline chart data.

use chrono::{Days, NaiveDate};
use taskboard_proto::task::Task;

/// Number of days the chart covers, starting today.
pub const CHART_DAYS: u64 = 7;

/// Tasks due on a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

impl DayBucket {
    #[must_use]
    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}

/// Deadline counts for today and the six following days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekChart {
    pub days: Vec<DayBucket>,
}

impl WeekChart {
    /// Buckets `tasks` by deadline. Tasks due outside the window, or with
    /// no deadline, are left out.
    #[must_use]
    pub fn build(tasks: &[Task], today: NaiveDate) -> Self {
        let days = (0..CHART_DAYS)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .map(|date| {
                let mut due: Vec<Task> = tasks
                    .iter()
                    .filter(|t| t.deadline == Some(date))
                    .cloned()
                    .collect();
                due.sort_by_key(|t| t.id);
                DayBucket { date, tasks: due }
            })
            .collect();
        Self { days }
    }

    /// Largest daily count, at least 1 so it can be used as a divisor.
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.days.iter().map(DayBucket::count).max().unwrap_or(0).max(1)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.days.iter().map(DayBucket::count).sum()
    }
}
