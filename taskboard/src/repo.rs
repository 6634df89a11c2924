//! Cached data layer between the board and the API.
//!
//! The repository keeps the last fetched task list. Any successful
//! mutation drops the whole cache so the next read refetches; a failed
//! mutation leaves it as it was. There are no optimistic updates and no
//! retries.

use taskboard_proto::task::{NewTask, StatusChange, Task, TaskId, TaskPatch, TaskStatus};

use crate::api::{ClientError, TaskApi};
use crate::board::Board;

/// Outcome of [`TaskRepository::move_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The task was already in the destination column; nothing was sent.
    Unchanged,
    /// The server accepted the move.
    Moved(Task),
}

pub struct TaskRepository<A> {
    api: A,
    cache: Option<Vec<Task>>,
    server_ordering: bool,
}

impl<A: TaskApi> TaskRepository<A> {
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self {
            api,
            cache: None,
            server_ordering: false,
        }
    }

    /// Leave the position of moved tasks to the server.
    #[must_use]
    pub const fn with_server_ordering(mut self, enabled: bool) -> Self {
        self.server_ordering = enabled;
        self
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub const fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// All tasks of the user, fetched on first use or after a mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the fetch fails.
    pub fn tasks(&mut self) -> Result<&[Task], ClientError> {
        let tasks = match self.cache.take() {
            Some(tasks) => tasks,
            None => {
                let tasks = self.api.list()?;
                tracing::debug!(count = tasks.len(), "task cache refreshed");
                tasks
            }
        };
        Ok(self.cache.insert(tasks).as_slice())
    }

    /// The cached tasks laid out as a board.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the fetch fails.
    pub fn board(&mut self) -> Result<Board, ClientError> {
        Ok(Board::from_tasks(self.tasks()?.iter().cloned()))
    }

    /// Creates a task at the tail of its column.
    ///
    /// An explicit `order` in `new` is sent as-is.
    ///
    /// # Errors
    ///
    /// [`ClientError::Invalid`] for a missing title or status, otherwise
    /// whatever the server returns.
    pub fn create(&mut self, mut new: NewTask) -> Result<Task, ClientError> {
        let Some(status) = new.status else {
            return Err(ClientError::Invalid("title and status are required".into()));
        };
        if new.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(ClientError::Invalid("title and status are required".into()));
        }
        if new.order.is_none() {
            new.order = Some(self.board()?.next_order(status));
        }
        let task = self.api.create(&new)?;
        tracing::info!(task_id = %task.id, status = %task.status, "task created");
        self.invalidate();
        Ok(task)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] from the server.
    pub fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Task, ClientError> {
        if patch.is_empty() {
            return Err(ClientError::Invalid("nothing to update".into()));
        }
        let task = self.api.update(id, patch)?;
        tracing::info!(task_id = %id, "task updated");
        self.invalidate();
        Ok(task)
    }

    /// Moves a task to the `to` column.
    ///
    /// The destination position is the current size of that column unless
    /// server ordering is enabled.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnknownTask`] if the task is not on the board,
    /// otherwise whatever the server returns.
    pub fn move_task(&mut self, id: TaskId, to: TaskStatus) -> Result<MoveOutcome, ClientError> {
        let change = self
            .board()?
            .plan_move(id, to, self.server_ordering)
            .map_err(ClientError::UnknownTask)?;
        let Some(change) = change else {
            return Ok(MoveOutcome::Unchanged);
        };
        let task = self.apply_status(id, &change)?;
        Ok(MoveOutcome::Moved(task))
    }

    /// Sends a status change as given.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] from the server.
    pub fn apply_status(&mut self, id: TaskId, change: &StatusChange) -> Result<Task, ClientError> {
        let task = self.api.update_status(id, change)?;
        tracing::info!(task_id = %id, status = %task.status, order = task.order, "task moved");
        self.invalidate();
        Ok(task)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] from the server.
    pub fn delete(&mut self, id: TaskId) -> Result<(), ClientError> {
        self.api.delete(id)?;
        tracing::info!(task_id = %id, "task deleted");
        self.invalidate();
        Ok(())
    }
}
