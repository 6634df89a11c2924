//! Client-side task filters.
//!
//! Filters never reach the server: they narrow the already fetched task
//! set. All criteria present in a [`TaskFilter`] must match.

use chrono::{Days, NaiveDate};
use taskboard_proto::task::{KNOWN_LISTS, Task};

/// Deadline buckets offered by the filter menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum DateFilter {
    /// Deadline is today.
    Today,
    /// Deadline falls in the six days after today.
    #[value(name = "next7days")]
    Next7Days,
    /// Deadline is before today.
    Overdue,
}

impl DateFilter {
    pub const ALL: [Self; 3] = [Self::Today, Self::Next7Days, Self::Overdue];

    /// Returns `true` if `deadline` falls in this bucket relative to `today`.
    #[must_use]
    pub fn contains(self, deadline: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Today => deadline == today,
            Self::Next7Days => {
                let first = today.checked_add_days(Days::new(1));
                let last = today.checked_add_days(Days::new(6));
                matches!((first, last), (Some(first), Some(last)) if (first..=last).contains(&deadline))
            }
            Self::Overdue => deadline < today,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Next7Days => "Next 7 days",
            Self::Overdue => "Overdue",
        }
    }
}

/// A combination of search text, deadline bucket and category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub search: Option<String>,
    pub date: Option<DateFilter>,
    pub list: Option<String>,
}

impl TaskFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.as_deref().is_none_or(str::is_empty) && self.date.is_none() && self.list.is_none()
    }

    /// Returns `true` if `task` satisfies every present criterion.
    #[must_use]
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        self.matches_search(task) && self.matches_date(task, today) && self.matches_list(task)
    }

    /// Tasks that pass the filter, in their original order.
    #[must_use]
    pub fn apply(&self, tasks: &[Task], today: NaiveDate) -> Vec<Task> {
        tasks
            .iter()
            .filter(|t| self.matches(t, today))
            .cloned()
            .collect()
    }

    fn matches_search(&self, task: &Task) -> bool {
        let Some(needle) = self.search.as_deref().filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }

    fn matches_date(&self, task: &Task, today: NaiveDate) -> bool {
        match (self.date, task.deadline) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(bucket), Some(deadline)) => bucket.contains(deadline, today),
        }
    }

    fn matches_list(&self, task: &Task) -> bool {
        self.list.as_deref().is_none_or(|list| task.list == list)
    }
}

/// Per-bucket and per-category counts for the filter menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCounts {
    pub today: usize,
    pub next_7_days: usize,
    pub overdue: usize,
    /// One entry per well-known category, in menu order.
    pub lists: Vec<(&'static str, usize)>,
}

impl FilterCounts {
    /// Counts over the full task set, ignoring any active filter.
    #[must_use]
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let in_bucket = |bucket: DateFilter| {
            tasks
                .iter()
                .filter(|t| t.deadline.is_some_and(|d| bucket.contains(d, today)))
                .count()
        };
        Self {
            today: in_bucket(DateFilter::Today),
            next_7_days: in_bucket(DateFilter::Next7Days),
            overdue: in_bucket(DateFilter::Overdue),
            lists: KNOWN_LISTS
                .iter()
                .map(|&list| (list, tasks.iter().filter(|t| t.list == list).count()))
                .collect(),
        }
    }

    #[must_use]
    pub const fn for_date(&self, bucket: DateFilter) -> usize {
        match bucket {
            DateFilter::Today => self.today,
            DateFilter::Next7Days => self.next_7_days,
            DateFilter::Overdue => self.overdue,
        }
    }
}
