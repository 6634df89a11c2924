//! Plain-text rendering of the board, filter menu and deadline chart.

use std::fmt::Write as _;

use chrono::NaiveDate;
use taskboard_proto::task::Task;

use crate::board::Board;
use crate::filter::{DateFilter, FilterCounts};
use crate::stats::WeekChart;

/// One line per task: id, title, category and deadline.
#[must_use]
pub fn task_line(task: &Task, today: NaiveDate) -> String {
    let mut line = format!("#{:<4} {}  [{}]", task.id, task.title, task.list);
    if let Some(deadline) = task.deadline {
        let _ = write!(line, "  due {deadline}");
        if deadline < today {
            line.push_str(" (overdue)");
        }
    }
    line
}

/// The three columns, each headed by its label and size.
#[must_use]
pub fn board(board: &Board, today: NaiveDate) -> String {
    let mut out = String::new();
    for (status, tasks) in board.columns() {
        let _ = writeln!(out, "{} ({})", status.label(), tasks.len());
        if tasks.is_empty() {
            out.push_str("  -\n");
        }
        for task in tasks {
            let _ = writeln!(out, "  {}", task_line(task, today));
            if !task.description.is_empty() {
                let _ = writeln!(out, "        {}", task.description);
            }
        }
        out.push('\n');
    }
    out
}

/// The filter menu line with a count next to every entry.
#[must_use]
pub fn filter_counts(counts: &FilterCounts) -> String {
    let dates: Vec<String> = DateFilter::ALL
        .iter()
        .map(|&bucket| format!("{} {}", bucket.label(), counts.for_date(bucket)))
        .collect();
    let lists: Vec<String> = counts
        .lists
        .iter()
        .map(|(list, n)| format!("{list} {n}"))
        .collect();
    format!("{} | {}", dates.join(", "), lists.join(", "))
}

/// Horizontal bar chart, bars scaled so the busiest day spans `width`.
#[must_use]
pub fn chart(chart: &WeekChart, width: usize) -> String {
    let max = chart.max_count();
    let mut out = String::new();
    for day in &chart.days {
        let bar = "#".repeat(day.count() * width / max);
        let _ = writeln!(
            out,
            "{} | {bar:<width$} {}",
            day.date.format("%a %m-%d"),
            day.count()
        );
    }
    out
}
