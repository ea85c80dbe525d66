//! Application boundary.
//!
//! [`App`] pairs the task list with a parser and turns every outcome into a
//! [`Notice`] for the user. Failures never leave the list half-changed.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use smartdo_proto::incoming::{ParseOutcome, TaskContext};
use smartdo_proto::task::TaskId;

use crate::parser::{ParseError, TaskParser};
use crate::store::KeyValueStore;
use crate::tasks::{ApplyOutcome, Bucket, RequestTicket, TaskError, TaskManager};
use crate::transfer::{ImportError, export_to_dir, import_from_path};

/// Shown when the parser fails for any reason.
pub const PARSE_FAILED: &str =
    "Failed to process tasks. Please try again. Make sure your API Key is valid.";

/// Whether a notice reports success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The operation went through.
    Success,
    /// The operation failed and nothing changed.
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Success or error.
    pub kind: NoticeKind,
    /// Message text.
    pub text: String,
}

impl Notice {
    /// A success notice.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    /// An error notice.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    /// Whether this reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A submission waiting for the parser.
#[derive(Debug, Clone)]
pub struct PendingSubmit {
    ticket: RequestTicket,
    instructions: String,
    context: Vec<TaskContext>,
}

impl PendingSubmit {
    /// The trimmed instructions.
    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Snapshot of the list taken when the submission started.
    #[must_use]
    pub fn context(&self) -> &[TaskContext] {
        &self.context
    }

    /// Fencing ticket of this submission.
    #[must_use]
    pub const fn ticket(&self) -> RequestTicket {
        self.ticket
    }
}

/// The task list plus its parser.
pub struct App<S: KeyValueStore, P: TaskParser> {
    manager: TaskManager<S>,
    parser: P,
    in_flight: Option<RequestTicket>,
}

impl<S: KeyValueStore, P: TaskParser> fmt::Debug for App<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("manager", &self.manager)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore, P: TaskParser> App<S, P> {
    /// Creates an app over a loaded task list.
    pub const fn new(manager: TaskManager<S>, parser: P) -> Self {
        Self {
            manager,
            parser,
            in_flight: None,
        }
    }

    /// The task list.
    #[must_use]
    pub const fn manager(&self) -> &TaskManager<S> {
        &self.manager
    }

    /// Mutable access to the task list, e.g. to subscribe.
    pub const fn manager_mut(&mut self) -> &mut TaskManager<S> {
        &mut self.manager
    }

    /// The parser used for submissions.
    #[must_use]
    pub const fn parser(&self) -> &P {
        &self.parser
    }

    /// Whether a submission is waiting for the parser.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a submission.
    ///
    /// Returns `None` for blank text or while another submission is in
    /// flight. Other operations stay available meanwhile.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingSubmit> {
        let instructions = text.trim();
        if instructions.is_empty() {
            return None;
        }
        if self.in_flight.is_some() {
            tracing::debug!("submission refused while another is in flight");
            return None;
        }
        let ticket = self.manager.begin_request();
        self.in_flight = Some(ticket);
        Some(PendingSubmit {
            ticket,
            instructions: instructions.to_string(),
            context: self.manager.context(),
        })
    }

    /// Completes a submission with the parser's result.
    ///
    /// Returns `None` when the result belongs to a superseded submission and
    /// was dropped, whether it succeeded or failed.
    pub fn finish_submit(
        &mut self,
        pending: PendingSubmit,
        result: Result<ParseOutcome, ParseError>,
        now: DateTime<Utc>,
    ) -> Option<Notice> {
        if self.in_flight == Some(pending.ticket) {
            self.in_flight = None;
        }
        if !self.manager.is_current(pending.ticket) {
            tracing::warn!(ticket = pending.ticket.seq(), "dropping superseded submission");
            return None;
        }
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "parse request failed");
                return Some(Notice::error(PARSE_FAILED));
            }
        };
        match self.manager.apply_parse(pending.ticket, outcome, now) {
            Ok(ApplyOutcome::Applied { rejected: 0, .. }) => {
                Some(Notice::success("List updated successfully."))
            }
            Ok(ApplyOutcome::Applied { rejected, .. }) => Some(Notice::success(format!(
                "List updated successfully. Skipped {rejected} incomplete item(s)."
            ))),
            Ok(ApplyOutcome::Stale) => None,
            Err(e) => Some(save_failed(&e)),
        }
    }

    /// Sends `text` to the parser and merges the answer into the list.
    pub async fn submit(&mut self, text: &str, now: DateTime<Utc>) -> Option<Notice> {
        let pending = self.begin_submit(text)?;
        let result = self
            .parser
            .parse(pending.instructions(), pending.context(), now)
            .await;
        self.finish_submit(pending, result, now)
    }

    /// Toggles a task's completion.
    pub fn toggle_complete(&mut self, id: &TaskId) -> Notice {
        match self.manager.toggle_complete(id) {
            Ok(true) => Notice::success("Marked as done."),
            Ok(false) => Notice::success("Marked as not done."),
            Err(e) => task_failed(&e),
        }
    }

    /// Toggles a subtask's completion.
    pub fn toggle_subtask(&mut self, task_id: &TaskId, subtask_id: &TaskId) -> Notice {
        match self.manager.toggle_subtask(task_id, subtask_id) {
            Ok(()) => Notice::success("Subtask updated."),
            Err(e) => task_failed(&e),
        }
    }

    /// Deletes a task.
    pub fn delete_task(&mut self, id: &TaskId) -> Notice {
        match self.manager.delete_task(id) {
            Ok(task) => Notice::success(format!("Deleted \"{}\".", task.title)),
            Err(e) => task_failed(&e),
        }
    }

    /// Moves a task into a bucket, optionally onto another task.
    ///
    /// Completion is never changed by a move, so only done tasks can be
    /// placed among completed ones.
    pub fn move_task<Tz: TimeZone>(
        &mut self,
        id: &TaskId,
        destination: Bucket,
        onto: Option<&TaskId>,
        now: &DateTime<Tz>,
    ) -> Notice {
        if destination == Bucket::Completed
            && self.manager.get(id).is_some_and(|task| !task.is_completed)
        {
            return Notice::error(format!(
                "Task {id} is not done. Mark it done before moving it among completed tasks."
            ));
        }
        match self.manager.move_task(id, destination, onto, now) {
            Ok(true) if destination == Bucket::Completed => {
                Notice::success("Reordered among completed tasks.")
            }
            Ok(true) => Notice::success(format!("Moved to {destination}.")),
            Ok(false) => Notice::success("Nothing to move."),
            Err(e) => task_failed(&e),
        }
    }

    /// Writes a dated backup into `dir`.
    pub fn export_to(&self, dir: &Path, today: NaiveDate) -> Notice {
        match export_to_dir(self.manager.tasks(), dir, today) {
            Ok(path) => Notice::success(format!("Backup saved to {}.", path.display())),
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                Notice::error(format!("Failed to save backup: {e}"))
            }
        }
    }

    /// Replaces the list with a backup file.
    pub fn import_from(&mut self, path: &Path) -> Notice {
        let tasks = match import_from_path(path) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "import failed");
                return Notice::error(match e {
                    ImportError::Format(_) => "Invalid file format. Expected a list of tasks.",
                    ImportError::Read { .. } => "Failed to read file.",
                    ImportError::Parse(_) | ImportError::InvalidTask { .. } => {
                        "Failed to parse file."
                    }
                });
            }
        };
        match self.manager.replace(tasks) {
            Ok(()) => Notice::success("Tasks restored successfully."),
            Err(e) => save_failed(&e),
        }
    }

    /// Deletes every task.
    pub fn clear(&mut self) -> Notice {
        match self.manager.clear() {
            Ok(()) => Notice::success("All tasks cleared."),
            Err(e) => save_failed(&e),
        }
    }
}

fn task_failed(err: &TaskError) -> Notice {
    match err {
        TaskError::TaskNotFound(id) => Notice::error(format!("No task with id {id}.")),
        TaskError::SubtaskNotFound { task, subtask } => {
            Notice::error(format!("Task {task} has no subtask {subtask}."))
        }
        TaskError::Store(_) | TaskError::Codec(_) => save_failed(err),
    }
}

fn save_failed(err: &TaskError) -> Notice {
    Notice::error(format!("Failed to save tasks: {err}"))
}
