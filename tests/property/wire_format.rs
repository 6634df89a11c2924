//! Property-based tests for the JSON wire format.
//!
//! Uses proptest to verify:
//! 1. Only the three status names deserialize; anything else is rejected.
//! 2. A serialized `Task` always carries `userId` and a known status name.
//! 3. Request bodies only carry the fields that were supplied.
//! 4. Negative positions are unrepresentable in request bodies.
//! 5. Status ordering matches column ordering.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;
use taskboard_proto::task::*;

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..20_000).prop_map(|d| {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default() + chrono::Duration::days(d)
    })
}

fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|s| DateTime::from_timestamp(s, 0).unwrap_or_default())
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        (1i64..1_000_000, 1i64..1_000_000),
        "[^\x00]{1,64}",
        "[^\x00]{0,128}",
        arb_status(),
        any::<u32>(),
        prop::option::of(arb_date()),
        "[a-z]{1,12}",
        arb_timestamp(),
    )
        .prop_map(
            |((id, user_id), title, description, status, order, deadline, list, at)| Task {
                id: TaskId::new(id),
                user_id,
                title,
                description,
                status,
                order,
                deadline,
                list,
                created_at: at,
                updated_at: at,
            },
        )
}

fn arb_new_task() -> impl Strategy<Value = NewTask> {
    (
        prop::option::of("[^\x00]{1,32}"),
        prop::option::of("[^\x00]{0,32}"),
        prop::option::of(arb_status()),
        prop::option::of(any::<u32>()),
        prop::option::of(arb_date()),
        prop::option::of("[a-z]{1,12}"),
    )
        .prop_map(|(title, description, status, order, deadline, list)| NewTask {
            title,
            description,
            status,
            order,
            deadline,
            list,
            ..NewTask::default()
        })
}

// --- Properties ---

proptest! {
    #[test]
    fn unknown_status_names_are_rejected(name in "[a-z_]{0,16}") {
        prop_assume!(!matches!(name.as_str(), "todo" | "in_progress" | "done"));
        let json = format!("\"{name}\"");
        prop_assert!(serde_json::from_str::<TaskStatus>(&json).is_err());
        prop_assert!(name.parse::<TaskStatus>().is_err());
    }

    #[test]
    fn serialized_task_uses_wire_names(task in arb_task()) {
        let value = serde_json::to_value(&task).unwrap();
        let obj = value.as_object().unwrap();
        prop_assert!(obj.contains_key("userId"));
        prop_assert!(!obj.contains_key("user_id"));
        let status = obj["status"].as_str().unwrap();
        prop_assert!(["todo", "in_progress", "done"].contains(&status));
        prop_assert_eq!(obj["order"].as_u64(), Some(u64::from(task.order)));

        let back: Task = serde_json::from_value(value).unwrap();
        prop_assert_eq!(back, task);
    }

    #[test]
    fn new_task_carries_only_supplied_fields(new in arb_new_task()) {
        let value = serde_json::to_value(&new).unwrap();
        let keys: BTreeSet<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();

        let mut expected = BTreeSet::new();
        for (key, present) in [
            ("title", new.title.is_some()),
            ("description", new.description.is_some()),
            ("status", new.status.is_some()),
            ("order", new.order.is_some()),
            ("deadline", new.deadline.is_some()),
            ("list", new.list.is_some()),
        ] {
            if present {
                expected.insert(key);
            }
        }
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn negative_order_is_unrepresentable(order in i64::MIN..0) {
        let body = format!(r#"{{"title":"t","status":"todo","order":{order}}}"#);
        prop_assert!(serde_json::from_str::<NewTask>(&body).is_err());
        let body = format!(r#"{{"status":"done","order":{order}}}"#);
        prop_assert!(serde_json::from_str::<StatusChange>(&body).is_err());
    }

    #[test]
    fn status_order_matches_columns(a in arb_status(), b in arb_status()) {
        prop_assert_eq!(a.cmp(&b), a.column().cmp(&b.column()));
        prop_assert_eq!(a.as_str().parse::<TaskStatus>().unwrap(), a);
    }
}
