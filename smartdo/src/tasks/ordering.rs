//! Sparse ordering keys.
//!
//! Tasks carry a floating-point `order`. New keys are spaced [`ORDER_GAP`]
//! apart so a task can later be placed between two neighbours by taking the
//! midpoint, without renumbering anything else.
//!
//! Repeated midpoints in the same neighbourhood eventually run out of
//! floating-point precision and collapse onto a neighbour. That is a known
//! limitation; there is no global renumbering pass.

use smartdo_proto::task::{Task, TaskRecord};

/// Distance between consecutively appended keys.
pub const ORDER_GAP: f64 = 1000.0;

/// Key for the first item of an empty list.
#[must_use]
pub const fn initial_key() -> f64 {
    ORDER_GAP
}

/// Key placing an item directly after `existing`.
#[must_use]
pub fn key_after(existing: f64) -> f64 {
    existing + ORDER_GAP
}

/// Key placing an item directly before `existing`.
#[must_use]
pub fn key_before(existing: f64) -> f64 {
    existing - ORDER_GAP
}

/// Key placing an item between `lower` and `upper`.
#[must_use]
pub fn key_between(lower: f64, upper: f64) -> f64 {
    f64::midpoint(lower, upper)
}

/// Highest order in `tasks`, or `0.0` for an empty list.
#[must_use]
pub fn max_order(tasks: &[Task]) -> f64 {
    tasks
        .iter()
        .map(|t| t.order)
        .filter(|o| o.is_finite())
        .fold(None, |acc: Option<f64>, o| Some(acc.map_or(o, |m| m.max(o))))
        .unwrap_or(0.0)
}

/// Which repair rule to apply to records that have no `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderRepair {
    /// Loading the persisted list: `(index + 1) * GAP`.
    Load,
    /// Importing a backup document: `index * GAP`.
    Import,
}

impl OrderRepair {
    #[allow(clippy::cast_precision_loss)]
    fn key_for(self, index: usize) -> f64 {
        match self {
            Self::Load => (index + 1) as f64 * ORDER_GAP,
            Self::Import => index as f64 * ORDER_GAP,
        }
    }
}

/// Turns records into tasks, assigning a key to every record without one.
///
/// Records that already carry a key keep it. Returns the tasks and the number
/// of records that were repaired.
#[must_use]
pub fn repair_orders(records: Vec<TaskRecord>, rule: OrderRepair) -> (Vec<Task>, usize) {
    let mut repaired = 0;
    let tasks = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let order = record.order.unwrap_or_else(|| {
                repaired += 1;
                rule.key_for(index)
            });
            record.into_task(order)
        })
        .collect();
    (tasks, repaired)
}
