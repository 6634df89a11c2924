//! Property-based tests for the client board model, filters and chart.
//!
//! Uses proptest to verify:
//! 1. Grouping keeps every task, in the column of its status, sorted.
//! 2. A planned move always targets the tail of the destination column.
//! 3. Composed filters select exactly the intersection of their parts.
//! 4. Date buckets never overlap.
//! 5. The chart spans seven days and counts every task due in them.

use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;
use taskboard::board::Board;
use taskboard::filter::{DateFilter, TaskFilter};
use taskboard::stats::WeekChart;
use taskboard_proto::task::{Task, TaskId, TaskStatus};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

fn arb_list() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("personal".to_string()),
        Just("work".to_string()),
        Just("grocery".to_string()),
        "[a-z]{3,8}",
    ]
}

/// Tasks with unique ids, small orders (so duplicates happen) and
/// deadlines within a few weeks of `today()`.
fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        (
            arb_status(),
            0u32..6,
            prop::option::of(-10i64..20),
            arb_list(),
            "[a-zA-Z ]{1,16}",
            "[a-zA-Z ]{0,16}",
        ),
        0..40,
    )
    .prop_map(|rows| {
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        rows.into_iter()
            .enumerate()
            .map(|(i, (status, order, offset, list, title, description))| Task {
                id: TaskId::new(i64::try_from(i).unwrap() + 1),
                user_id: 1,
                title,
                description,
                status,
                order,
                deadline: offset.map(|d| today() + chrono::Duration::days(d)),
                list,
                created_at: at,
                updated_at: at,
            })
            .collect()
    })
}

fn arb_filter() -> impl Strategy<Value = TaskFilter> {
    (
        prop::option::of("[a-zA-Z]{0,3}"),
        prop::option::of(prop_oneof![
            Just(DateFilter::Today),
            Just(DateFilter::Next7Days),
            Just(DateFilter::Overdue),
        ]),
        prop::option::of(arb_list()),
    )
        .prop_map(|(search, date, list)| TaskFilter { search, date, list })
}

// --- Properties ---

proptest! {
    #[test]
    fn grouping_keeps_every_task_sorted(tasks in arb_tasks()) {
        let board = Board::from_tasks(tasks.clone());
        prop_assert_eq!(board.len(), tasks.len());
        for (status, column) in board.columns() {
            prop_assert!(column.iter().all(|t| t.status == status));
            let keys: Vec<(u32, TaskId)> = column.iter().map(|t| (t.order, t.id)).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);
        }
    }

    #[test]
    fn planned_move_targets_tail(tasks in arb_tasks(), pick in any::<prop::sample::Index>(), to in arb_status()) {
        prop_assume!(!tasks.is_empty());
        let task = &tasks[pick.index(tasks.len())];
        let board = Board::from_tasks(tasks.clone());

        let planned = board.plan_move(task.id, to, false).unwrap();
        if task.status == to {
            prop_assert!(planned.is_none());
        } else {
            let change = planned.unwrap();
            prop_assert_eq!(change.status, to);
            let expected = u32::try_from(board.column(to).len()).unwrap();
            prop_assert_eq!(change.order, Some(expected));

            let appended = board.plan_move(task.id, to, true).unwrap().unwrap();
            prop_assert_eq!(appended.order, None);
        }
    }

    #[test]
    fn composed_filter_is_intersection(tasks in arb_tasks(), filter in arb_filter()) {
        let parts = [
            TaskFilter { search: filter.search.clone(), ..TaskFilter::default() },
            TaskFilter { date: filter.date, ..TaskFilter::default() },
            TaskFilter { list: filter.list.clone(), ..TaskFilter::default() },
        ];
        let selected = filter.apply(&tasks, today());
        let expected: Vec<Task> = tasks
            .iter()
            .filter(|t| parts.iter().all(|p| p.matches(t, today())))
            .cloned()
            .collect();
        prop_assert_eq!(selected, expected);
    }

    #[test]
    fn date_buckets_are_disjoint(offset in -400i64..400) {
        let deadline = today() + chrono::Duration::days(offset);
        let hits = [DateFilter::Today, DateFilter::Next7Days, DateFilter::Overdue]
            .iter()
            .filter(|b| b.contains(deadline, today()))
            .count();
        prop_assert!(hits <= 1);
        prop_assert_eq!(hits == 0, offset >= 7);
    }

    #[test]
    fn chart_counts_tasks_due_this_week(tasks in arb_tasks()) {
        let chart = WeekChart::build(&tasks, today());
        prop_assert_eq!(chart.days.len(), 7);
        let last = today() + chrono::Duration::days(6);
        let due = tasks
            .iter()
            .filter(|t| t.deadline.is_some_and(|d| d >= today() && d <= last))
            .count();
        prop_assert_eq!(chart.total(), due);
        prop_assert!(chart.max_count() >= 1);
    }
}
