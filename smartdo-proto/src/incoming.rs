//! Payload exchanged with the text-to-structure parser.
//!
//! The parser receives a minimal [`TaskContext`] snapshot of the current list
//! and answers with a `{"tasks": [...]}` document. [`ParseOutcome::from_model_text`]
//! turns that raw text into validated [`IncomingTask`]s, rejecting malformed
//! items one by one instead of failing the whole response.

use chrono::SecondsFormat;
use serde::{Deserialize, Deserializer, Serialize};

use crate::task::{Priority, Subtask, Task};

/// Errors for a parser response that cannot be used at all.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The response was not JSON, or lacked a top-level `tasks` array.
    #[error("malformed parser output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A subtask as proposed by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingSubtask {
    /// Prior id, `"NEW"`, or absent.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Title; a missing title is carried through as empty.
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    /// Completion flag, only when the parser sent a real boolean.
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    /// Children, in display order.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Self>,
}

/// A top-level task as proposed by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingTask {
    /// Prior id, `"NEW"`, or absent.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Task title (required, non-blank).
    pub title: String,
    /// Optional notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Due date as text; see [`crate::task::parse_due_date`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Priority (required).
    pub priority: Priority,
    /// Category label (required).
    pub category: String,
    /// Completion flag, only when the parser sent a real boolean.
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    /// Proposed subtask tree.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<IncomingSubtask>,
}

impl From<&Subtask> for IncomingSubtask {
    fn from(subtask: &Subtask) -> Self {
        Self {
            id: Some(subtask.id.to_string()),
            title: subtask.title.clone(),
            is_completed: Some(subtask.is_completed),
            subtasks: subtask.subtasks.iter().map(Self::from).collect(),
        }
    }
}

/// Echoes an existing task back as the parser would when leaving it unchanged.
impl From<&Task> for IncomingTask {
    fn from(task: &Task) -> Self {
        Self {
            id: Some(task.id.to_string()),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task
                .due_date
                .map(|d| d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            priority: task.priority,
            category: task.category.clone(),
            is_completed: Some(task.is_completed),
            subtasks: task.subtasks.iter().map(IncomingSubtask::from).collect(),
        }
    }
}

/// An item of the parser response that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTask {
    /// Position in the response's `tasks` array.
    pub index: usize,
    /// Why the item was rejected.
    pub reason: String,
}

/// A validated parser response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Items that passed validation, in response order.
    pub tasks: Vec<IncomingTask>,
    /// Items that were dropped.
    pub rejected: Vec<RejectedTask>,
}

#[derive(Deserialize)]
struct RawResponse {
    tasks: Vec<serde_json::Value>,
}

impl ParseOutcome {
    /// Wraps already-validated tasks.
    #[must_use]
    pub const fn accepted(tasks: Vec<IncomingTask>) -> Self {
        Self {
            tasks,
            rejected: Vec::new(),
        }
    }

    /// Parses the raw text returned by the model.
    ///
    /// Markdown code fences around the JSON are stripped. Each element of
    /// `tasks` is validated independently: an element missing `title`,
    /// `priority` or `category`, or carrying a blank title or an unknown
    /// priority, ends up in [`ParseOutcome::rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] if the text is not JSON or has no
    /// top-level `tasks` array.
    pub fn from_model_text(text: &str) -> Result<Self, PayloadError> {
        let raw: RawResponse = serde_json::from_str(strip_code_fences(text))?;
        let mut outcome = Self::default();
        for (index, value) in raw.tasks.into_iter().enumerate() {
            match validate_item(value) {
                Ok(task) => outcome.tasks.push(task),
                Err(reason) => {
                    tracing::warn!(index, %reason, "rejecting parser item");
                    outcome.rejected.push(RejectedTask { index, reason });
                }
            }
        }
        Ok(outcome)
    }
}

fn validate_item(value: serde_json::Value) -> Result<IncomingTask, String> {
    let task: IncomingTask = serde_json::from_value(value).map_err(|e| e.to_string())?;
    if task.title.trim().is_empty() {
        return Err("title is blank".to_string());
    }
    Ok(task)
}

/// Removes a surrounding ```` ```json ```` / ```` ``` ```` fence, if present.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Minimal view of a subtask sent to the parser as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskContext {
    /// Id to echo back.
    pub id: String,
    /// Title.
    pub title: String,
    /// Completion flag.
    pub is_completed: bool,
    /// Children, omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Self>,
}

/// Minimal view of a task sent to the parser as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    /// Id to echo back.
    pub id: String,
    /// Title.
    pub title: String,
    /// Due date in RFC 3339, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Completion flag.
    pub is_completed: bool,
    /// Subtask tree.
    pub subtasks: Vec<SubtaskContext>,
}

impl From<&Subtask> for SubtaskContext {
    fn from(subtask: &Subtask) -> Self {
        Self {
            id: subtask.id.to_string(),
            title: subtask.title.clone(),
            is_completed: subtask.is_completed,
            subtasks: subtask.subtasks.iter().map(Self::from).collect(),
        }
    }
}

impl From<&Task> for TaskContext {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            due_date: task
                .due_date
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            is_completed: task.is_completed,
            subtasks: task.subtasks.iter().map(SubtaskContext::from).collect(),
        }
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
