//! Property-based tests for task-list documents and parser payloads.
//!
//! Uses proptest to verify:
//! 1. A stored list decodes back to the same tasks, keys included.
//! 2. Arbitrary text never panics the document or payload decoders.
//! 3. Arbitrary due-date text never panics `parse_due_date`.
//! 4. Payload validation splits items into accepted and rejected, never both.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use smartdo_proto::codec::{decode_records, encode_list};
use smartdo_proto::incoming::ParseOutcome;
use smartdo_proto::task::{Priority, Subtask, Task, TaskId, parse_due_date};

// --- Strategies ---

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low)
    ]
}

/// Millisecond timestamps between 2000 and 2100.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800_000_i64..4_102_444_800_000_i64)
        .prop_map(|ms| Utc.timestamp_millis_opt(ms).single().unwrap_or_default())
}

fn arb_subtask() -> impl Strategy<Value = Subtask> {
    let leaf = ("[a-z0-9-]{1,12}", ".{0,24}", any::<bool>()).prop_map(|(id, title, done)| {
        Subtask {
            id: TaskId::from(id),
            title,
            is_completed: done,
            subtasks: vec![],
        }
    });
    leaf.prop_recursive(3, 12, 3, |inner| {
        (
            "[a-z0-9-]{1,12}",
            ".{0,24}",
            any::<bool>(),
            prop::collection::vec(inner, 0..3),
        )
            .prop_map(|(id, title, done, subtasks)| Subtask {
                id: TaskId::from(id),
                title,
                is_completed: done,
                subtasks,
            })
    })
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9-]{1,16}",
        ".{1,40}",
        prop::option::of(".{0,40}"),
        prop::option::of(arb_instant()),
        arb_priority(),
        "[A-Za-z ]{0,12}",
        any::<bool>(),
        arb_instant(),
        -1.0e9_f64..1.0e9_f64,
        prop::collection::vec(arb_subtask(), 0..4),
    )
        .prop_map(
            |(id, title, description, due_date, priority, category, done, created_at, order, subtasks)| {
                Task {
                    id: TaskId::from(id),
                    title,
                    description,
                    due_date,
                    priority,
                    category,
                    is_completed: done,
                    created_at,
                    order,
                    subtasks,
                }
            },
        )
}

/// One parser item, some of which are missing required fields.
fn arb_payload_item() -> impl Strategy<Value = serde_json::Value> {
    (
        prop::option::of(".{0,20}"),
        prop::option::of(prop_oneof![
            Just("High".to_string()),
            Just("low".to_string()),
            Just("Urgent".to_string()),
        ]),
        prop::option::of("[A-Za-z]{0,10}"),
    )
        .prop_map(|(title, priority, category)| {
            let mut item = serde_json::json!({ "id": "NEW" });
            if let Some(title) = title {
                item["title"] = title.into();
            }
            if let Some(priority) = priority {
                item["priority"] = priority.into();
            }
            if let Some(category) = category {
                item["category"] = category.into();
            }
            item
        })
}

// --- Properties ---

proptest! {
    #[test]
    fn stored_list_decodes_to_same_tasks(tasks in prop::collection::vec(arb_task(), 0..8)) {
        let text = encode_list(&tasks).unwrap();
        let records = decode_records(&text).unwrap();
        prop_assert_eq!(records.len(), tasks.len());
        for (record, task) in records.into_iter().zip(&tasks) {
            let order = record.order;
            prop_assert_eq!(order, Some(task.order));
            prop_assert_eq!(&record.into_task(task.order), task);
        }
    }

    #[test]
    fn decode_records_never_panics(text in ".{0,256}") {
        let _ = decode_records(&text);
    }

    #[test]
    fn from_model_text_never_panics(text in ".{0,256}") {
        let _ = ParseOutcome::from_model_text(&text);
    }

    #[test]
    fn parse_due_date_never_panics(text in ".{0,40}") {
        let _ = parse_due_date(&text);
    }

    #[test]
    fn rfc3339_due_dates_are_exact(instant in arb_instant()) {
        let text = instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        prop_assert_eq!(parse_due_date(&text), Some(instant));
    }

    #[test]
    fn every_payload_item_is_accepted_or_rejected(
        items in prop::collection::vec(arb_payload_item(), 0..10)
    ) {
        let text = serde_json::json!({ "tasks": items }).to_string();
        let outcome = ParseOutcome::from_model_text(&text).unwrap();
        prop_assert_eq!(outcome.tasks.len() + outcome.rejected.len(), items.len());
        for task in &outcome.tasks {
            prop_assert!(!task.title.trim().is_empty());
        }
        let mut indices: Vec<usize> = outcome.rejected.iter().map(|r| r.index).collect();
        indices.dedup();
        prop_assert_eq!(indices.len(), outcome.rejected.len());
    }
}
