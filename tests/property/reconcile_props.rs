//! Property-based tests for reconciliation, ordering keys and bucketing.
//!
//! Uses proptest to verify:
//! 1. Echoing the list back unchanged is a no-op.
//! 2. Updated tasks keep id, `createdAt` and `order`; new tasks sort after them.
//! 3. Output ids are always unique.
//! 4. Every task falls into exactly one board bucket.
//! 5. Midpoint keys land strictly between their neighbours.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use proptest::prelude::*;
use smartdo::tasks::ordering::{key_between, max_order};
use smartdo::tasks::{Bucket, classify, reconcile_tasks};
use smartdo_proto::incoming::IncomingTask;
use smartdo_proto::task::{Priority, Subtask, Task, TaskId};

// --- Strategies ---

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low)
    ]
}

fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (1_700_000_000_000_i64..1_900_000_000_000_i64)
        .prop_map(|ms| Utc.timestamp_millis_opt(ms).single().unwrap_or_default())
}

fn arb_subtasks() -> impl Strategy<Value = Vec<Subtask>> {
    let leaf = ("[a-z0-9]{6,10}", "[a-z ]{1,12}", any::<bool>()).prop_map(|(id, title, done)| {
        Subtask {
            id: TaskId::from(id),
            title,
            is_completed: done,
            subtasks: vec![],
        }
    });
    let node = leaf.prop_recursive(2, 8, 2, |inner| {
        (
            "[a-z0-9]{6,10}",
            "[a-z ]{1,12}",
            any::<bool>(),
            prop::collection::vec(inner, 0..2),
        )
            .prop_map(|(id, title, done, subtasks)| Subtask {
                id: TaskId::from(id),
                title,
                is_completed: done,
                subtasks,
            })
    });
    prop::collection::vec(node, 0..3)
}

/// A list of tasks with unique ids `t0`, `t1`, ...
fn arb_list() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        (
            "[a-z ]{1,20}",
            prop::option::of(arb_instant()),
            arb_priority(),
            any::<bool>(),
            arb_instant(),
            -1.0e6_f64..1.0e6_f64,
            arb_subtasks(),
        ),
        0..10,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(
                |(i, (title, due_date, priority, done, created_at, order, subtasks))| Task {
                    id: TaskId::from(format!("t{i}")),
                    title,
                    description: None,
                    due_date,
                    priority,
                    category: "Work".to_string(),
                    is_completed: done,
                    created_at,
                    order,
                    subtasks,
                },
            )
            .collect()
    })
}

fn fresh(title: &str) -> IncomingTask {
    IncomingTask {
        id: Some("NEW".to_string()),
        title: title.to_string(),
        description: None,
        due_date: None,
        priority: Priority::Medium,
        category: "Errands".to_string(),
        is_completed: None,
        subtasks: vec![],
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

// --- Properties ---

proptest! {
    #[test]
    fn echo_is_a_no_op(existing in arb_list()) {
        let echo: Vec<IncomingTask> = existing.iter().map(IncomingTask::from).collect();
        prop_assert_eq!(reconcile_tasks(&existing, echo, now()), existing);
    }

    #[test]
    fn updates_keep_identity_and_new_tasks_go_last(
        existing in arb_list(),
        keep in prop::collection::vec(any::<bool>(), 10),
        added in 0usize..4,
    ) {
        let kept: Vec<&Task> = existing.iter().zip(&keep).filter(|(_, k)| **k).map(|(t, _)| t).collect();
        let mut incoming: Vec<IncomingTask> = kept.iter().map(|t| {
            let mut echo = IncomingTask::from(*t);
            echo.title = format!("{} (edited)", t.title);
            echo.is_completed = None;
            echo
        }).collect();
        incoming.extend((0..added).map(|i| fresh(&format!("new {i}"))));

        let out = reconcile_tasks(&existing, incoming, now());
        prop_assert_eq!(out.len(), kept.len() + added);

        for (old, new) in kept.iter().zip(&out) {
            prop_assert_eq!(&old.id, &new.id);
            prop_assert_eq!(old.created_at, new.created_at);
            prop_assert_eq!(old.order, new.order);
            prop_assert_eq!(old.is_completed, new.is_completed);
        }

        let floor = max_order(&existing);
        let new_orders: Vec<f64> = out[kept.len()..].iter().map(|t| t.order).collect();
        for pair in new_orders.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for (task, order) in out[kept.len()..].iter().zip(&new_orders) {
            prop_assert!(*order > floor);
            prop_assert_eq!(task.created_at, now());
            prop_assert!(!task.is_completed);
        }
    }

    #[test]
    fn output_ids_are_unique(existing in arb_list(), dupes in 0usize..3, added in 0usize..4) {
        let mut incoming: Vec<IncomingTask> = existing.iter().map(IncomingTask::from).collect();
        // The parser may echo the same id more than once.
        if let Some(first) = existing.first() {
            incoming.extend((0..dupes).map(|_| IncomingTask::from(first)));
        }
        incoming.extend((0..added).map(|i| fresh(&format!("new {i}"))));

        let out = reconcile_tasks(&existing, incoming, now());
        let ids: HashSet<&str> = out.iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(ids.len(), out.len());
    }

    #[test]
    fn every_task_lands_in_one_bucket(
        tasks in arb_list(),
        offset_hours in -12i32..=14,
        now_ms in 1_700_000_000_000_i64..1_900_000_000_000_i64,
    ) {
        let zone = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let now = zone.timestamp_millis_opt(now_ms).single().unwrap();
        let buckets = classify(&tasks, &now);

        let mut seen: Vec<&str> = Bucket::ALL
            .iter()
            .flat_map(|b| buckets.bucket(*b).iter().map(|t| t.id.as_str()))
            .collect();
        prop_assert_eq!(seen.len(), tasks.len());
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), tasks.len());

        for task in buckets.upcoming.iter().filter(|t| t.due_date.is_some()) {
            let due = task.due_date.unwrap().with_timezone(&zone);
            prop_assert!(due.date_naive() > now.date_naive());
        }
        for task in &buckets.overdue {
            let due = task.due_date.unwrap().with_timezone(&zone);
            prop_assert!(due.date_naive() < now.date_naive());
        }
        for pair in buckets.due_today.windows(2) {
            prop_assert!(pair[0].order <= pair[1].order);
        }
    }

    #[test]
    fn midpoint_is_strictly_between(lower in -1.0e9_f64..1.0e9, gap in 1.0e-3_f64..1.0e6) {
        let upper = lower + gap;
        let mid = key_between(lower, upper);
        prop_assert!(lower < mid && mid < upper);
        prop_assert_eq!(key_between(upper, lower), mid);
    }
}

#[test]
fn repeated_midpoints_eventually_collapse() {
    let (lower, mut upper) = (1000.0_f64, 2000.0_f64);
    let mut steps = 0;
    while key_between(lower, upper) > lower {
        upper = key_between(lower, upper);
        steps += 1;
    }
    assert!(steps > 30);
    assert!(upper - lower < 1.0e-9);
}
