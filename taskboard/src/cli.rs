//! Subcommands of the `taskboard` binary and their execution.
//!
//! Account commands talk to [`AuthApi`] and the session file. Task
//! commands run against a [`TaskRepository`], so they work the same over
//! HTTP and over the in-memory API used in tests. Every command reports
//! its outcome through the [`Notifier`].

use std::io::Write;

use chrono::NaiveDate;
use taskboard_proto::auth::Credentials;
use taskboard_proto::task::{NewTask, TaskId, TaskPatch, TaskStatus};

use crate::api::{AuthApi, ClientError, HttpTaskApi, TaskApi};
use crate::config::ClientConfig;
use crate::filter::{DateFilter, FilterCounts, TaskFilter};
use crate::notify::Notifier;
use crate::render;
use crate::repo::{MoveOutcome, TaskRepository};
use crate::session::{Session, SessionStore};
use crate::stats::WeekChart;

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and sign in.
    Register {
        username: String,
        #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in to an existing account.
    Login {
        username: String,
        #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the board.
    Board {
        /// Case-insensitive text to look for in titles and descriptions.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        date: Option<DateFilter>,
        /// Only tasks in this category.
        #[arg(long)]
        list: Option<String>,
    },
    /// Add a task at the bottom of a column.
    Add {
        title: String,
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        #[arg(long)]
        description: Option<String>,
        /// Due date, `YYYY-MM-DD`.
        #[arg(long)]
        deadline: Option<NaiveDate>,
        #[arg(long)]
        list: Option<String>,
    },
    /// Change fields of a task.
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        deadline: Option<NaiveDate>,
        #[arg(long)]
        list: Option<String>,
    },
    /// Move a task to another column.
    Move { id: i64, status: TaskStatus },
    /// Delete a task.
    Delete { id: i64 },
    /// Deadlines over the next seven days.
    Chart,
}

impl Command {
    /// Subcommand name, safe to log.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::Board { .. } => "board",
            Self::Add { .. } => "add",
            Self::Edit { .. } => "edit",
            Self::Move { .. } => "move",
            Self::Delete { .. } => "delete",
            Self::Chart => "chart",
        }
    }

    /// Returns `true` for commands that need a signed-in user.
    #[must_use]
    pub const fn needs_session(&self) -> bool {
        !matches!(
            self,
            Self::Register { .. } | Self::Login { .. } | Self::Logout
        )
    }
}

/// Runs `command` end to end: account commands directly, task commands
/// against the HTTP API with the stored session.
///
/// # Errors
///
/// Returns [`ClientError`] on any failure; the notifier already carries a
/// matching error toast.
pub fn run(
    command: Command,
    config: &ClientConfig,
    notifier: &mut Notifier,
    out: &mut impl Write,
) -> Result<(), ClientError> {
    let sessions = SessionStore::new(config.session_path.clone());
    let result = if command.needs_session() {
        sessions.load().map_err(ClientError::from).and_then(|session| {
            let api = HttpTaskApi::from_session(config.api_url.clone(), session.as_ref())?;
            let mut repo = TaskRepository::new(api).with_server_ordering(config.server_ordering);
            let today = chrono::Local::now().date_naive();
            run_task_command(command, &mut repo, today, config.chart_width, notifier, out)
        })
    } else {
        run_account_command(command, &AuthApi::new(config.api_url.clone()), &sessions, notifier)
    };
    if let Err(e) = &result {
        notifier.error(error_message(e));
    }
    result
}

fn run_account_command(
    command: Command,
    auth: &AuthApi,
    sessions: &SessionStore,
    notifier: &mut Notifier,
) -> Result<(), ClientError> {
    match command {
        Command::Register { username, password } => {
            let response = auth.register(&Credentials::new(username, password))?;
            let session = Session::from(response);
            sessions.save(&session)?;
            notifier.success(format!("Registered and signed in as {}", session.username));
        }
        Command::Login { username, password } => {
            let response = auth.login(&Credentials::new(username, password))?;
            let session = Session::from(response);
            sessions.save(&session)?;
            notifier.success(format!("Signed in as {}", session.username));
        }
        Command::Logout => {
            if sessions.clear()? {
                notifier.success("Signed out");
            } else {
                notifier.success("Not signed in");
            }
        }
        other => {
            tracing::warn!(command = other.name(), "task command routed to account handler");
            return Err(ClientError::NotAuthenticated);
        }
    }
    Ok(())
}

/// Runs a task command against `repo`, writing any view to `out`.
///
/// # Errors
///
/// Returns [`ClientError`] from the repository or from writing output.
pub fn run_task_command<A: TaskApi>(
    command: Command,
    repo: &mut TaskRepository<A>,
    today: NaiveDate,
    chart_width: usize,
    notifier: &mut Notifier,
    out: &mut impl Write,
) -> Result<(), ClientError> {
    match command {
        Command::Board { search, date, list } => {
            let filter = TaskFilter { search, date, list };
            let tasks = repo.tasks()?;
            let counts = FilterCounts::compute(tasks, today);
            let board = crate::board::Board::from_tasks(filter.apply(tasks, today));
            write_out(out, &render::filter_counts(&counts))?;
            write_out(out, "")?;
            write_out(out, render::board(&board, today).trim_end())?;
        }
        Command::Add {
            title,
            status,
            description,
            deadline,
            list,
        } => {
            let new = NewTask {
                description,
                deadline,
                list,
                ..NewTask::new(title, status)
            };
            let task = repo.create(new)?;
            notifier.success(format!("Task #{} created", task.id));
        }
        Command::Edit {
            id,
            title,
            description,
            deadline,
            list,
        } => {
            let patch = TaskPatch {
                title,
                description,
                deadline,
                list,
                ..TaskPatch::default()
            };
            let task = repo.update(TaskId::new(id), &patch)?;
            notifier.success(format!("Task #{} updated", task.id));
        }
        Command::Move { id, status } => match repo.move_task(TaskId::new(id), status)? {
            MoveOutcome::Moved(task) => {
                notifier.success(format!("Task #{} moved to {}", task.id, task.status.label()));
            }
            MoveOutcome::Unchanged => {
                notifier.success(format!("Task #{id} is already in {}", status.label()));
            }
        },
        Command::Delete { id } => {
            repo.delete(TaskId::new(id))?;
            notifier.success(format!("Task #{id} deleted"));
        }
        Command::Chart => {
            let chart = WeekChart::build(repo.tasks()?, today);
            write_out(out, render::chart(&chart, chart_width).trim_end())?;
        }
        other => {
            tracing::warn!(command = other.name(), "account command routed to task handler");
            return Err(ClientError::Invalid("not a task command".into()));
        }
    }
    Ok(())
}

fn write_out(out: &mut impl Write, text: &str) -> Result<(), ClientError> {
    writeln!(out, "{text}").map_err(|e| ClientError::Transport(format!("stdout: {e}")))
}

/// User-facing text for an error toast.
#[must_use]
pub fn error_message(err: &ClientError) -> String {
    match err {
        ClientError::NotAuthenticated => "Please log in first (taskboard login <username>)".into(),
        e if e.is_unauthorized() => "Session expired, please log in again".into(),
        ClientError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
