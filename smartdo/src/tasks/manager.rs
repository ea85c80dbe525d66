//! The task list store object.
//!
//! `TaskManager` owns the in-memory list, writes the whole list to a
//! [`KeyValueStore`] after every mutation, and notifies subscribers. A
//! mutation is committed only after the write succeeds, so a failed write
//! leaves both the store and the in-memory list as they were.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use smartdo_proto::codec::{decode_records, encode_list};
use smartdo_proto::incoming::{ParseOutcome, TaskContext};
use smartdo_proto::task::{Task, TaskId, toggle_subtask_in};

use super::TaskError;
use super::classify::{BoardStats, Bucket, Buckets, classify};
use super::ordering::{OrderRepair, repair_orders};
use super::reconcile::reconcile_tasks;
use super::reorder::{DropUpdate, resolve_drop};
use crate::store::KeyValueStore;

/// Handle returned by [`TaskManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Sequence number attached to an outstanding parser request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    /// The raw sequence number.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

/// Result of applying a parser response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The response was reconciled into the list.
    Applied {
        /// Number of tasks in the new list.
        tasks: usize,
        /// Number of response items rejected by validation.
        rejected: usize,
    },
    /// A newer request was issued after this one; the list is unchanged.
    Stale,
}

type Listener = Box<dyn Fn(&[Task]) + Send>;

/// Owns the task list and keeps it in sync with the durable store.
pub struct TaskManager<S: KeyValueStore> {
    store: S,
    key: String,
    tasks: Vec<Task>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    last_ticket: u64,
}

impl<S: KeyValueStore> fmt::Debug for TaskManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("key", &self.key)
            .field("tasks", &self.tasks.len())
            .field("listeners", &self.listeners.len())
            .field("last_ticket", &self.last_ticket)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> TaskManager<S> {
    /// Loads the list stored under `key`.
    ///
    /// A missing key yields an empty list. Tasks stored without an `order`
    /// get `(index + 1) * GAP` and the repaired list is written back at once.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the store cannot be read (or the
    /// repaired list cannot be written back) and [`TaskError::Codec`] if the
    /// stored document is not a task list.
    pub fn load(store: S, key: impl Into<String>) -> Result<Self, TaskError> {
        let key = key.into();
        let mut manager = Self {
            store,
            key,
            tasks: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            last_ticket: 0,
        };
        let Some(text) = manager.store.get(&manager.key)? else {
            tracing::info!(key = %manager.key, "no stored task list, starting empty");
            return Ok(manager);
        };
        let (tasks, repaired) = repair_orders(decode_records(&text)?, OrderRepair::Load);
        tracing::info!(key = %manager.key, tasks = tasks.len(), repaired, "loaded task list");
        if repaired > 0 {
            manager.persist(&tasks)?;
        }
        manager.tasks = tasks;
        Ok(manager)
    }

    /// The current list, in canonical (list) order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// The store key the list is written under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replaces the whole list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] if the list cannot be persisted; the previous
    /// list is kept in that case.
    pub fn replace(&mut self, tasks: Vec<Task>) -> Result<(), TaskError> {
        tracing::info!(tasks = tasks.len(), "replacing task list");
        self.commit(tasks)
    }

    /// Registers `listener` to be called with the list after every change.
    pub fn subscribe(&mut self, listener: impl Fn(&[Task]) + Send + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Minimal context describing the current list for the parser.
    #[must_use]
    pub fn context(&self) -> Vec<TaskContext> {
        self.tasks.iter().map(TaskContext::from).collect()
    }

    /// Issues the ticket for a new parser request.
    ///
    /// Issuing a ticket makes every earlier ticket stale.
    pub fn begin_request(&mut self) -> RequestTicket {
        self.last_ticket += 1;
        RequestTicket(self.last_ticket)
    }

    /// Whether `ticket` belongs to the most recent request.
    #[must_use]
    pub const fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.last_ticket
    }

    /// Reconciles a parser response into the current list.
    ///
    /// The response is merged against the list as it is now, not as it was
    /// when the request was made, so edits made in the meantime to tasks
    /// the response echoes are overwritten by the response.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] if the new list cannot be persisted.
    pub fn apply_parse(
        &mut self,
        ticket: RequestTicket,
        outcome: ParseOutcome,
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome, TaskError> {
        if !self.is_current(ticket) {
            tracing::warn!(
                ticket = ticket.0,
                latest = self.last_ticket,
                "ignoring stale parser response"
            );
            return Ok(ApplyOutcome::Stale);
        }
        let rejected = outcome.rejected.len();
        let next = reconcile_tasks(&self.tasks, outcome.tasks, now);
        let tasks = next.len();
        self.commit(next)?;
        Ok(ApplyOutcome::Applied { tasks, rejected })
    }

    /// Flips a task's completion flag and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] for an unknown id, or a
    /// persistence error.
    pub fn toggle_complete(&mut self, id: &TaskId) -> Result<bool, TaskError> {
        let mut next = self.tasks.clone();
        let task = find_mut(&mut next, id)?;
        task.is_completed = !task.is_completed;
        let done = task.is_completed;
        self.commit(next)?;
        Ok(done)
    }

    /// Flips the completion flag of a subtask anywhere under `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] or [`TaskError::SubtaskNotFound`]
    /// for unknown ids, or a persistence error.
    pub fn toggle_subtask(&mut self, task_id: &TaskId, subtask_id: &TaskId) -> Result<(), TaskError> {
        let mut next = self.tasks.clone();
        let task = find_mut(&mut next, task_id)?;
        if !toggle_subtask_in(&mut task.subtasks, subtask_id) {
            return Err(TaskError::SubtaskNotFound {
                task: task_id.to_string(),
                subtask: subtask_id.to_string(),
            });
        }
        self.commit(next)
    }

    /// Removes a task and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] for an unknown id, or a
    /// persistence error.
    pub fn delete_task(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        let index = self
            .tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))?;
        let mut next = self.tasks.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    /// Merges a resolved drop into a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] for an unknown id, or a
    /// persistence error.
    pub fn apply_drop(&mut self, id: &TaskId, update: &DropUpdate) -> Result<(), TaskError> {
        let mut next = self.tasks.clone();
        update.apply_to(find_mut(&mut next, id)?);
        self.commit(next)
    }

    /// Drags task `id` into `destination`, onto task `onto` or into empty
    /// space. Returns `false` for a self-drop, which changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] if either id is unknown, or a
    /// persistence error.
    pub fn move_task<Tz: TimeZone>(
        &mut self,
        id: &TaskId,
        destination: Bucket,
        onto: Option<&TaskId>,
        now: &DateTime<Tz>,
    ) -> Result<bool, TaskError> {
        let dragged = self
            .get(id)
            .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))?;
        let target = onto
            .map(|t| self.get(t).ok_or_else(|| TaskError::TaskNotFound(t.to_string())))
            .transpose()?;
        let buckets = classify(&self.tasks, now);
        let update = resolve_drop(
            dragged,
            target,
            destination,
            buckets.bucket(destination),
            now.with_timezone(&Utc),
        );
        match update {
            Some(update) => {
                self.apply_drop(id, &update)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Empties the list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] if the empty list cannot be persisted.
    pub fn clear(&mut self) -> Result<(), TaskError> {
        tracing::info!(removed = self.tasks.len(), "clearing task list");
        self.commit(Vec::new())
    }

    /// The list partitioned into display buckets.
    #[must_use]
    pub fn buckets<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Buckets<'_> {
        classify(&self.tasks, now)
    }

    /// Completion figures for the whole list.
    #[must_use]
    pub fn stats(&self) -> BoardStats {
        BoardStats::of(&self.tasks)
    }

    fn persist(&self, tasks: &[Task]) -> Result<(), TaskError> {
        let document = encode_list(tasks)?;
        self.store.put(&self.key, &document).map_err(|e| {
            tracing::warn!(key = %self.key, error = %e, "failed to persist task list");
            TaskError::from(e)
        })
    }

    fn commit(&mut self, tasks: Vec<Task>) -> Result<(), TaskError> {
        self.persist(&tasks)?;
        self.tasks = tasks;
        for (_, listener) in &self.listeners {
            listener(&self.tasks);
        }
        Ok(())
    }
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &TaskId) -> Result<&'a mut Task, TaskError> {
    tasks
        .iter_mut()
        .find(|t| &t.id == id)
        .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))
}
