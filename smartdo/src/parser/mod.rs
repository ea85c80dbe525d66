//! Turning free-form instructions into a proposed task list.
//!
//! A [`TaskParser`] receives the user's text plus a minimal view of the
//! current list and answers with the full list it thinks should exist. The
//! answer is validated item by item before reconciliation.

pub mod gemini;

use std::future::Future;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use smartdo_proto::incoming::{ParseOutcome, PayloadError, TaskContext};

pub use gemini::GeminiParser;

/// Categories the parser is steered towards when the user names none.
pub const STANDARD_CATEGORIES: [&str; 7] = [
    "Work",
    "Personal",
    "Health",
    "Education",
    "Finance",
    "Errands",
    "Home",
];

/// Prompt users can paste into another assistant so its output comes back
/// as a hierarchical list this app reads well.
pub const HELPER_PROMPT: &str = "Analyze the provided content (calendar, notes, or list) and organize it into a strict hierarchical to-do list.

Formatting Rules:
- Start every line with a simple dash (-).
- Use exactly 2 spaces for indentation to show subtasks.
- Do not use bold text, markdown headers, or conversational filler.
- Group related items logically.
- Output ONLY the final list.";

/// Errors from a parse request. Every variant means the list stays as it is.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No API key is configured.
    #[error("no API key configured (set GEMINI_API_KEY or pass --api-key)")]
    MissingApiKey,

    /// The request could not be sent or the response could not be read.
    #[error("parser request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("parser returned HTTP {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response carried no text.
    #[error("parser returned no text")]
    EmptyResponse,

    /// The response text was not a task list.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The current list could not be serialized as context.
    #[error("failed to encode task context: {0}")]
    Context(#[source] serde_json::Error),
}

/// Something that can turn instructions into a proposed task list.
pub trait TaskParser: Send + Sync {
    /// Parses `instructions` against the `current` list as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the parser is unavailable, the transport
    /// fails, or the answer is not a task list.
    fn parse(
        &self,
        instructions: &str,
        current: &[TaskContext],
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<ParseOutcome, ParseError>> + Send;
}

/// Builds the prompt sent to the model.
///
/// # Errors
///
/// Returns [`ParseError::Context`] if the context cannot be serialized.
pub fn build_prompt(
    instructions: &str,
    current: &[TaskContext],
    now: DateTime<Utc>,
) -> Result<String, ParseError> {
    let context = serde_json::to_string(current).map_err(ParseError::Context)?;
    let categories = STANDARD_CATEGORIES
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "You are an expert Productivity Assistant.
Current Date/Time: {now}.

YOUR GOAL:
Organize the user's life into a structured, actionable JSON list based on \"User Instructions\" and the \"Current State\".

INPUT DATA:
1. Current State (JSON): {context}
2. User Instructions: \"{instructions}\"

RULES FOR PROCESSING:
1. Updates: Match existing tasks by ID/Title. Update fields if requested. KEEP THE SAME ID, including for subtasks.
2. New Tasks: Add new items with ID \"NEW\".
3. Categories: If the user doesn't specify a category, INFER it from the context. Use one of these standard categories if possible: {categories}.
4. Dates: If no time is specified but the task implies urgency (e.g., \"urgent\", \"asap\"), set priority to 'High'. If a day is mentioned (\"Friday\"), calculate the ISO date.
5. Completion: If the user implies completion (\"done\", \"finished\", \"checked off\"), set 'isCompleted' to true.
6. Return every task that should remain on the list; omitted tasks are removed.

OUTPUT FORMAT:
Return a JSON object with a 'tasks' array.",
        now = now.to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

/// JSON response schema for the task list, with subtasks nested `depth`
/// levels below the first subtask level.
#[must_use]
pub fn response_schema(depth: usize) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tasks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING", "description": "Must match existing ID or be 'NEW'" },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "dueDate": { "type": "STRING", "description": "ISO 8601 date string or null" },
                        "priority": { "type": "STRING", "enum": ["High", "Medium", "Low"] },
                        "category": { "type": "STRING", "description": "Inferred category (Work, Personal, etc)" },
                        "isCompleted": { "type": "BOOLEAN" },
                        "subtasks": { "type": "ARRAY", "items": subtask_schema(depth) }
                    },
                    "required": ["title", "priority", "category"]
                }
            }
        },
        "required": ["tasks"]
    })
}

fn subtask_schema(depth: usize) -> Value {
    let mut properties = json!({
        "id": { "type": "STRING", "description": "Keep existing ID if updating, or use 'NEW'" },
        "title": { "type": "STRING" },
        "isCompleted": { "type": "BOOLEAN" }
    });
    if depth > 0 {
        properties["subtasks"] = json!({ "type": "ARRAY", "items": subtask_schema(depth - 1) });
    }
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": ["title"]
    })
}
