//! Three-column board view over a user's tasks.

use taskboard_proto::task::{StatusChange, Task, TaskId, TaskStatus};

/// Tasks grouped by column, each column in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    columns: [Vec<Task>; 3],
}

impl Board {
    /// Groups `tasks` into columns sorted by `(order, id)`.
    ///
    /// Equal `order` values are allowed; the id keeps their relative
    /// position stable.
    #[must_use]
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut columns: [Vec<Task>; 3] = Default::default();
        for task in tasks {
            columns[task.status.column()].push(task);
        }
        for column in &mut columns {
            column.sort_by_key(|t| (t.order, t.id));
        }
        Self { columns }
    }

    /// Tasks in `status`, top to bottom.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        &self.columns[status.column()]
    }

    /// Columns paired with their status, in board order.
    pub fn columns(&self) -> impl Iterator<Item = (TaskStatus, &[Task])> {
        TaskStatus::ALL
            .into_iter()
            .map(|status| (status, self.column(status)))
    }

    #[must_use]
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.columns.iter().flatten().find(|t| t.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Vec::is_empty)
    }

    /// Position a new or moved task gets at the tail of `status`.
    #[must_use]
    pub fn next_order(&self, status: TaskStatus) -> u32 {
        u32::try_from(self.column(status).len()).unwrap_or(u32::MAX)
    }

    /// Plans moving `id` to the `to` column.
    ///
    /// Returns `Ok(None)` when the task already sits in `to`. With
    /// `server_ordering` the order is left to the server, otherwise it is
    /// the current size of the destination column.
    ///
    /// # Errors
    ///
    /// Returns the id back if it is not on the board.
    pub fn plan_move(
        &self,
        id: TaskId,
        to: TaskStatus,
        server_ordering: bool,
    ) -> Result<Option<StatusChange>, TaskId> {
        let task = self.find(id).ok_or(id)?;
        if task.status == to {
            return Ok(None);
        }
        let change = if server_ordering {
            StatusChange::append(to)
        } else {
            StatusChange::to_position(to, self.next_order(to))
        };
        Ok(Some(change))
    }
}
