//! Side effects of dragging a task into a bucket.

use chrono::{DateTime, Duration, Utc};
use smartdo_proto::task::{Priority, Task};

use super::classify::Bucket;
use super::ordering::{initial_key, key_after, key_before, key_between};

/// Partial update produced by a drop, merged into the dragged task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropUpdate {
    /// New due date, if the destination implies one.
    pub due_date: Option<DateTime<Utc>>,
    /// New priority, if the destination implies one.
    pub priority: Option<Priority>,
    /// New ordering key.
    pub order: f64,
}

impl DropUpdate {
    /// Merges the update into `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        task.order = self.order;
    }
}

/// Works out how `dragged` changes when dropped into `destination`.
///
/// `target` is the task it was dropped onto, or `None` for empty space.
/// `bucket_contents` is the destination bucket in display order; the dragged
/// task itself is ignored if present. Returns `None` when a task is dropped
/// onto itself.
#[must_use]
pub fn resolve_drop(
    dragged: &Task,
    target: Option<&Task>,
    destination: Bucket,
    bucket_contents: &[&Task],
    now: DateTime<Utc>,
) -> Option<DropUpdate> {
    if target.is_some_and(|t| t.id == dragged.id) {
        return None;
    }

    let (due_date, priority) = match destination {
        Bucket::DueToday => (Some(now), None),
        Bucket::Upcoming => (Some(now + Duration::days(1)), None),
        Bucket::Overdue => {
            let keep_past = dragged.due_date.is_some_and(|due| due <= now);
            ((!keep_past).then_some(now), Some(Priority::High))
        }
        Bucket::Completed => (None, None),
    };

    let others: Vec<&Task> = bucket_contents
        .iter()
        .copied()
        .filter(|t| t.id != dragged.id)
        .collect();

    let order = match target.and_then(|t| others.iter().position(|o| o.id == t.id)) {
        Some(0) => key_before(others[0].order),
        Some(pos) => key_between(others[pos - 1].order, others[pos].order),
        None => others.last().map_or_else(initial_key, |last| key_after(last.order)),
    };

    tracing::debug!(task = %dragged.id, %destination, order, "resolved drop");
    Some(DropUpdate {
        due_date,
        priority,
        order,
    })
}
