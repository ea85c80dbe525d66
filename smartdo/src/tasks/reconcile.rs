//! Pure reconciliation of parser output with the current task list.
//!
//! The parser's answer is authoritative for *which* tasks exist and for
//! their descriptive fields, but identity, creation time, manual order and
//! (when the parser says nothing) completion are carried over from the
//! existing list by id.
//!
//! Matching is by id equality only. A task the parser renames without
//! echoing its id is a new task.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use smartdo_proto::incoming::{IncomingSubtask, IncomingTask};
use smartdo_proto::task::{Subtask, Task, TaskId, parse_due_date, prior_identity};

use super::ordering::{ORDER_GAP, max_order};

/// Builds canonical subtasks from the parser's proposal.
///
/// Subtask identity and completion travel inside the payload: the parser was
/// given the prior tree as context and is expected to echo ids and flags for
/// unchanged nodes. A node without a boolean completion flag comes back
/// incomplete. Output order is input order; depth is unbounded.
#[must_use]
pub fn reconcile_subtasks(incoming: Vec<IncomingSubtask>) -> Vec<Subtask> {
    incoming
        .into_iter()
        .map(|node| Subtask {
            id: prior_identity(node.id.as_deref()).map_or_else(TaskId::new, TaskId::from),
            title: node.title,
            is_completed: node.is_completed.unwrap_or(false),
            subtasks: reconcile_subtasks(node.subtasks),
        })
        .collect()
}

/// Merges the parser's proposed task list into `existing`.
///
/// One output task per incoming entry, in incoming order; tasks missing from
/// `incoming` are dropped. For each entry:
///
/// 1. It updates an existing task if its id names one, otherwise it is new
///    and gets a fresh id.
/// 2. Completion comes from the entry if given, else from the existing task,
///    else `false`.
/// 3. `created_at` is inherited, or `now` for new tasks.
/// 4. `order` is inherited, or the next key above the current maximum for new
///    tasks (one gap apart within a pass). A non-finite key falls back to
///    `(position + 1) * GAP`.
/// 5. Title, description, due date, priority and category are taken from the
///    entry as-is.
/// 6. Subtasks go through [`reconcile_subtasks`].
#[must_use]
pub fn reconcile_tasks(existing: &[Task], incoming: Vec<IncomingTask>, now: DateTime<Utc>) -> Vec<Task> {
    let by_id: HashMap<&str, &Task> = existing.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut taken: HashSet<String> = existing.iter().map(|t| t.id.to_string()).collect();
    let mut matched: HashSet<&str> = HashSet::new();
    let mut next_order = max_order(existing);
    let (mut updated, mut created) = (0usize, 0usize);

    let reconciled: Vec<Task> = incoming
        .into_iter()
        .enumerate()
        .map(|(position, entry)| {
            let prior = prior_identity(entry.id.as_deref())
                .and_then(|id| by_id.get(id).copied())
                .filter(|&task| matched.insert(task.id.as_str()));

            let (id, is_completed, created_at, order) = if let Some(old) = prior {
                updated += 1;
                (
                    old.id.clone(),
                    entry.is_completed.unwrap_or(old.is_completed),
                    old.created_at,
                    old.order,
                )
            } else {
                created += 1;
                next_order += ORDER_GAP;
                (
                    fresh_id(&mut taken),
                    entry.is_completed.unwrap_or(false),
                    now,
                    next_order,
                )
            };

            Task {
                id,
                title: entry.title,
                description: entry.description,
                due_date: entry.due_date.as_deref().and_then(parse_due_date),
                priority: entry.priority,
                category: entry.category,
                is_completed,
                created_at,
                order: finite_or_fallback(order, position),
                subtasks: reconcile_subtasks(entry.subtasks),
            }
        })
        .collect();

    tracing::debug!(
        updated,
        created,
        dropped = existing.len() - updated,
        "reconciled task list"
    );
    reconciled
}

fn fresh_id(taken: &mut HashSet<String>) -> TaskId {
    loop {
        let id = TaskId::new();
        if taken.insert(id.to_string()) {
            return id;
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn finite_or_fallback(order: f64, position: usize) -> f64 {
    if order.is_finite() {
        order
    } else {
        (position + 1) as f64 * ORDER_GAP
    }
}
