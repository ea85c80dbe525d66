//! JSON encoding for task-list documents.
//!
//! The same document format backs the persisted store and the export/import
//! backups: a top-level JSON array of tasks.

use crate::task::{Task, TaskRecord};

/// Error type for document encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    /// The document is not valid JSON.
    #[error("document is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// The document is valid JSON but its top-level value is not an array.
    #[error("expected a list of tasks, found {0}")]
    NotAList(&'static str),
    /// An element of the array is not a task.
    #[error("entry {index} is not a valid task: {source}")]
    InvalidTask {
        /// Position of the offending entry.
        index: usize,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Encodes a task list as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if a task cannot be serialized.
pub fn encode_list(tasks: &[Task]) -> Result<String, CodecError> {
    serde_json::to_string_pretty(tasks).map_err(CodecError::Serialization)
}

/// Decodes a task-list document into tolerant [`TaskRecord`]s.
///
/// Records may lack an `order`; callers repair those before use.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`] for unparseable text,
/// [`CodecError::NotAList`] when the top-level value is not an array, and
/// [`CodecError::InvalidTask`] for the first element that is not a task.
pub fn decode_records(text: &str) -> Result<Vec<TaskRecord>, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(CodecError::InvalidJson)?;
    let serde_json::Value::Array(items) = value else {
        return Err(CodecError::NotAList(json_kind(&value)));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|source| CodecError::InvalidTask { index, source })
        })
        .collect()
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
