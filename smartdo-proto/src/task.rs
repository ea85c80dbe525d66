//! Task model for `SmartDo`.
//!
//! A [`Task`] is a top-level to-do item with a manual ordering key and a tree
//! of [`Subtask`]s. Field names serialize in camelCase so that task-list
//! documents stay compatible with the browser build of the app.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Reserved id value meaning "this entity has no prior identity".
pub const NEW_ID_SENTINEL: &str = "NEW";

/// Opaque identifier shared by tasks and subtasks.
///
/// Freshly allocated ids are UUID v7 strings; ids read back from documents or
/// echoed by the parser are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocates a new, globally unique identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the id carried by an incoming entity if it names a prior identity.
///
/// Absent, empty, and [`NEW_ID_SENTINEL`] ids all mean "allocate a new one".
#[must_use]
pub fn prior_identity(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty() && *id != NEW_ID_SENTINEL)
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Priority {
    /// Urgent. Undated high-priority tasks are treated as due today.
    High,
    /// Default priority.
    Medium,
    /// Can wait.
    Low,
}

impl Priority {
    /// Returns the canonical label (`"High"`, `"Medium"`, `"Low"`).
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Error returned when a priority label is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0:?}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = UnknownPriority;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A node in a task's subtask tree.
///
/// Sequence position is the display order; there is no ordering key at
/// this level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Stable identifier, unique within the owning tree.
    pub id: TaskId,
    /// Subtask title.
    pub title: String,
    /// Whether the subtask has been checked off.
    #[serde(default)]
    pub is_completed: bool,
    /// Child subtasks, in display order.
    #[serde(default)]
    pub subtasks: Vec<Self>,
}

/// Completion counts over a whole subtask tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtaskProgress {
    /// Number of subtasks at every depth.
    pub total: usize,
    /// How many of them are completed.
    pub completed: usize,
}

impl SubtaskProgress {
    fn add(&mut self, subtasks: &[Subtask]) {
        for subtask in subtasks {
            self.total += 1;
            if subtask.is_completed {
                self.completed += 1;
            }
            self.add(&subtask.subtasks);
        }
    }
}

impl Subtask {
    /// Counts this node's descendants (not the node itself).
    #[must_use]
    pub fn progress(&self) -> SubtaskProgress {
        let mut progress = SubtaskProgress::default();
        progress.add(&self.subtasks);
        progress
    }
}

/// Flips the completion flag of every subtask with `id` anywhere in the tree.
///
/// A matched node's own children are not searched. Returns `false` if no
/// node matched.
pub fn toggle_subtask_in(subtasks: &mut [Subtask], id: &TaskId) -> bool {
    let mut found = false;
    for subtask in subtasks {
        if subtask.id == *id {
            subtask.is_completed = !subtask.is_completed;
            found = true;
        } else if toggle_subtask_in(&mut subtask.subtasks, id) {
            found = true;
        }
    }
    found
}

/// A top-level to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable identifier, unique across the task list.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Optional free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional due timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_due_date"
    )]
    pub due_date: Option<DateTime<Utc>>,
    /// Task priority.
    pub priority: Priority,
    /// Free-form category label ("Work", "Health", ...).
    pub category: String,
    /// Whether the task has been completed.
    pub is_completed: bool,
    /// Set once when the task is first created; never mutated.
    pub created_at: DateTime<Utc>,
    /// Manual ordering key. Only relative order matters.
    pub order: f64,
    /// Subtask tree, in display order.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Completion counts over the task's entire subtask tree.
    #[must_use]
    pub fn subtask_progress(&self) -> SubtaskProgress {
        let mut progress = SubtaskProgress::default();
        progress.add(&self.subtasks);
        progress
    }
}

/// Tolerant on-disk shape of a task.
///
/// Used when loading the persisted list and when importing a backup: `order`
/// may be missing (it is repaired by the caller) and secondary fields fall
/// back to defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Stable identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Optional notes.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional due timestamp.
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<DateTime<Utc>>,
    /// Task priority.
    pub priority: Priority,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Completion flag.
    #[serde(default)]
    pub is_completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Ordering key, if present.
    #[serde(default)]
    pub order: Option<f64>,
    /// Subtask tree.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl TaskRecord {
    /// Builds a [`Task`] using `order` as the ordering key.
    #[must_use]
    pub fn into_task(self, order: f64) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            category: self.category,
            is_completed: self.is_completed,
            created_at: self.created_at,
            order,
            subtasks: self.subtasks,
        }
    }
}

/// Parses a due-date string as produced by the parser or older documents.
///
/// - RFC 3339 with an offset is taken exactly.
/// - A date-time without offset is local wall-clock time.
/// - A bare `YYYY-MM-DD` is midnight UTC.
///
/// Anything else (including an empty string) yields `None`.
#[must_use]
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    tracing::warn!(due_date = raw, "ignoring unparseable due date");
    None
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_due_date))
}
