//! HTTP access to the taskboard server.
//!
//! [`TaskApi`] is the seam between the cached data layer and the network:
//! [`HttpTaskApi`] talks to a real server, tests substitute an in-memory
//! implementation. [`AuthApi`] covers the two unauthenticated endpoints.

use serde::Serialize;
use serde::de::DeserializeOwned;
use taskboard_proto::auth::{AuthResponse, Credentials};
use taskboard_proto::error::ErrorBody;
use taskboard_proto::task::{NewTask, StatusChange, Task, TaskId, TaskPatch};
use url::Url;

use crate::session::{Session, SessionError};

/// Errors surfaced by the client library.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No session token; the user has to log in first.
    #[error("not logged in")]
    NotAuthenticated,

    /// The server answered with an error status.
    #[error("{message} (HTTP {status})")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The server's `error` text.
        message: String,
    },

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The task is not on the cached board.
    #[error("task {0} not found")]
    UnknownTask(TaskId),

    /// A required field is missing or empty.
    #[error("{0}")]
    Invalid(String),

    /// Reading or writing the session file failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl ClientError {
    /// Returns `true` for a 401 from the server.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Task operations against the server, scoped to the signed-in user.
pub trait TaskApi {
    /// Fetches every task of the user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or server failure.
    fn list(&self) -> Result<Vec<Task>, ClientError>;

    /// Creates a task and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or server failure.
    fn create(&self, task: &NewTask) -> Result<Task, ClientError>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or server failure.
    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ClientError>;

    /// Moves a task to another column.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or server failure.
    fn update_status(&self, id: TaskId, change: &StatusChange) -> Result<Task, ClientError>;

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or server failure.
    fn delete(&self, id: TaskId) -> Result<(), ClientError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Shared request plumbing for both API clients.
#[derive(Clone)]
struct Http {
    agent: ureq::Agent,
    base: Url,
}

impl Http {
    fn new(base: Url) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        Self { agent, base }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base.as_str().trim_end_matches('/'))
    }

    fn request(&self, method: &str, path: &str, token: Option<&str>) -> ureq::Request {
        let url = self.endpoint(path);
        tracing::debug!(%method, %url, "api request");
        let req = self.agent.request(method, &url);
        match token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .request(method, path, token)
            .send_json(body)
            .map_err(from_ureq)?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ClientError> {
    response
        .into_json()
        .map_err(|e| ClientError::Decode(e.to_string()))
}

fn from_ureq(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_json::<ErrorBody>()
                .map_or_else(|_| "request failed".to_string(), |body| body.error);
            tracing::warn!(status, %message, "api error");
            ClientError::Api { status, message }
        }
        ureq::Error::Transport(transport) => {
            tracing::warn!(error = %transport, "api transport error");
            ClientError::Transport(transport.to_string())
        }
    }
}

/// [`TaskApi`] over HTTP with a bearer token.
#[derive(Clone)]
pub struct HttpTaskApi {
    http: Http,
    token: String,
}

impl HttpTaskApi {
    /// Builds a client for `base` that authenticates with `token`.
    #[must_use]
    pub fn new(base: Url, token: impl Into<String>) -> Self {
        Self {
            http: Http::new(base),
            token: token.into(),
        }
    }

    /// Builds a client from a stored session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] when there is no session;
    /// no request is attempted.
    pub fn from_session(base: Url, session: Option<&Session>) -> Result<Self, ClientError> {
        let session = session.ok_or(ClientError::NotAuthenticated)?;
        Ok(Self::new(base, session.token.clone()))
    }

    fn task_path(id: TaskId) -> String {
        format!("tasks/{id}")
    }
}

impl TaskApi for HttpTaskApi {
    fn list(&self) -> Result<Vec<Task>, ClientError> {
        let response = self
            .http
            .request("GET", "tasks", Some(&self.token))
            .call()
            .map_err(from_ureq)?;
        decode(response)
    }

    fn create(&self, task: &NewTask) -> Result<Task, ClientError> {
        self.http.send_json("POST", "tasks", Some(&self.token), task)
    }

    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ClientError> {
        self.http
            .send_json("PUT", &Self::task_path(id), Some(&self.token), patch)
    }

    fn update_status(&self, id: TaskId, change: &StatusChange) -> Result<Task, ClientError> {
        let path = format!("{}/status", Self::task_path(id));
        self.http.send_json("PATCH", &path, Some(&self.token), change)
    }

    fn delete(&self, id: TaskId) -> Result<(), ClientError> {
        self.http
            .request("DELETE", &Self::task_path(id), Some(&self.token))
            .call()
            .map_err(from_ureq)?;
        Ok(())
    }
}

/// Client for `/auth/register` and `/auth/login`.
#[derive(Clone)]
pub struct AuthApi {
    http: Http,
}

impl AuthApi {
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            http: Http::new(base),
        }
    }

    /// Creates an account and returns a fresh session.
    ///
    /// # Errors
    ///
    /// [`ClientError::Api`] with status 400 if the username is taken.
    pub fn register(&self, creds: &Credentials) -> Result<AuthResponse, ClientError> {
        self.http.send_json("POST", "auth/register", None, creds)
    }

    /// Signs in and returns a fresh session.
    ///
    /// # Errors
    ///
    /// [`ClientError::Api`] with status 400 for bad credentials.
    pub fn login(&self, creds: &Credentials) -> Result<AuthResponse, ClientError> {
        self.http.send_json("POST", "auth/login", None, creds)
    }
}
