//! SQLite-backed persistence for users and tasks.
//!
//! Every task statement carries a `user_id = ?` predicate: ownership is a
//! row filter, so a foreign task is indistinguishable from a missing one.
//! Each public operation runs exactly one SQL statement; mutations use
//! `RETURNING` so the caller gets the stored row without a second query.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use taskboard_proto::task::{StatusChange, Task, TaskId, TaskPatch, TaskStatus};

/// Columns returned for a task, in the order [`task_from_row`] reads them.
const TASK_COLUMNS: &str =
    r#"id, user_id, title, description, status, "order", deadline, list, created_at, updated_at"#;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  username TEXT NOT NULL UNIQUE,
  password_hash TEXT NOT NULL,
  created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id),
  title TEXT NOT NULL,
  description TEXT NOT NULL DEFAULT '',
  status TEXT NOT NULL CHECK (status IN ('todo', 'in_progress', 'done')),
  "order" INTEGER NOT NULL DEFAULT 0 CHECK ("order" BETWEEN 0 AND 4294967295),
  deadline TEXT,
  list TEXT NOT NULL DEFAULT 'personal',
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS tasks_user_status_idx ON tasks(user_id, status, "order");
"#;

/// Errors raised by the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The username is already registered.
    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    /// Appending would push the column tail past the largest position.
    #[error("no position left at the end of the {0} column")]
    ColumnFull(TaskStatus),

    /// Could not create the directory holding the database file.
    #[error("failed to create database directory: {0}")]
    CreateDir(#[source] std::io::Error),

    /// Any other SQLite failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A stored account, including its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// A fully defaulted task ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub order: u32,
    pub deadline: Option<NaiveDate>,
    pub list: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Relational store shared by all request handlers.
///
/// A single connection guarded by a mutex; statements are short, so
/// handlers call in directly instead of hopping to a blocking pool.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory cannot be created or SQLite
    /// refuses to open the file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(StoreError::CreateDir)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Inserts a new account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateUsername`] if `username` is taken.
    pub fn insert_user(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)
             RETURNING id",
            params![username, password_hash, Utc::now()],
            |row| row.get::<_, i64>(0),
        );
        match result {
            Ok(id) => Ok(UserRecord {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::DuplicateUsername(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Looks an account up by username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on query failure.
    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, username, password_hash FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Number of registered accounts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on query failure.
    pub fn count_users(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// All tasks owned by `user_id`, in board order: by status column, then
    /// `order`, then id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on query failure or an unreadable row.
    pub fn list_tasks(&self, user_id: i64) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1
               ORDER BY CASE status WHEN 'todo' THEN 0 WHEN 'in_progress' THEN 1 ELSE 2 END,
                        "order", id"#
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![user_id], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Inserts a task owned by `user_id` and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the insert fails (for example an
    /// unknown owner).
    pub fn insert_task(&self, user_id: i64, draft: &TaskDraft) -> Result<Task, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            r#"INSERT INTO tasks
                 (user_id, title, description, status, "order", deadline, list, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
               RETURNING {TASK_COLUMNS}"#
        );
        let task = conn.query_row(
            &sql,
            params![
                user_id,
                draft.title,
                draft.description,
                draft.status.as_str(),
                draft.order,
                draft.deadline,
                draft.list,
                draft.created_at,
                draft.updated_at,
            ],
            task_from_row,
        )?;
        Ok(task)
    }

    /// Applies a partial update: supplied fields replace, absent fields keep.
    ///
    /// Returns `None` when no task matches `(id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on statement failure.
    pub fn update_task(
        &self,
        user_id: i64,
        id: TaskId,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            r#"UPDATE tasks SET
                 title = COALESCE(?1, title),
                 description = COALESCE(?2, description),
                 status = COALESCE(?3, status),
                 "order" = COALESCE(?4, "order"),
                 deadline = COALESCE(?5, deadline),
                 list = COALESCE(?6, list),
                 updated_at = ?7
               WHERE id = ?8 AND user_id = ?9
               RETURNING {TASK_COLUMNS}"#
        );
        let task = conn
            .query_row(
                &sql,
                params![
                    patch.title,
                    patch.description,
                    patch.status.map(TaskStatus::as_str),
                    patch.order,
                    patch.deadline,
                    patch.list,
                    now,
                    id.get(),
                    user_id,
                ],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Moves a task to another column.
    ///
    /// Only `status`, `order`, `deadline`, `list` and `updated_at` change.
    /// Without an explicit `order` the task goes to the tail of the
    /// destination group; the position is computed inside the same
    /// statement, so two concurrent appends cannot read the same tail.
    ///
    /// Returns `None` when no task matches `(id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ColumnFull`] when the destination tail already
    /// sits at `u32::MAX`; the row is left unchanged. Returns
    /// [`StoreError::Sqlite`] on any other statement failure.
    pub fn update_status(
        &self,
        user_id: i64,
        id: TaskId,
        change: &StatusChange,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            r#"UPDATE tasks SET
                 status = ?1,
                 "order" = COALESCE(?2, (
                   SELECT COALESCE(MAX(t."order") + 1, 0) FROM tasks t
                   WHERE t.user_id = ?6 AND t.status = ?1 AND t.id != ?5
                 )),
                 deadline = COALESCE(?3, deadline),
                 list = COALESCE(?4, list),
                 updated_at = ?7
               WHERE id = ?5 AND user_id = ?6
               RETURNING {TASK_COLUMNS}"#
        );
        let result = conn
            .query_row(
                &sql,
                params![
                    change.status.as_str(),
                    change.order,
                    change.deadline,
                    change.list,
                    id.get(),
                    user_id,
                    now,
                ],
                task_from_row,
            )
            .optional();
        match result {
            Ok(task) => Ok(task),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_CHECK =>
            {
                Err(StoreError::ColumnFull(change.status))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a task. Returns `false` when no task matches `(id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on statement failure.
    pub fn delete_task(&self, user_id: i64, id: TaskId) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id.get(), user_id],
        )?;
        Ok(removed > 0)
    }

    /// Total number of task rows across all users.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] on query failure.
    pub fn count_tasks(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(4)?;
    let status = status
        .parse::<TaskStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Task {
        id: TaskId::new(row.get(0)?),
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status,
        order: row.get(5)?,
        deadline: row.get(6)?,
        list: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
