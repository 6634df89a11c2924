//! Persisted sign-in state.
//!
//! The token returned by register / login is written to a small TOML file
//! so later commands can reuse it. Logging out deletes the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use taskboard_proto::auth::AuthResponse;

/// Errors from reading or writing the session file.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The file exists but could not be read.
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file or its directory could not be written.
    #[error("failed to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a valid session.
    #[error("corrupt session file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode session: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// A signed-in user and their bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub username: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .finish()
    }
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self {
            token: auth.token,
            user_id: auth.user.id,
            username: auth.user.username,
        }
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored session. A missing file means "not signed in".
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(toml::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Writes `session`, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the file cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let write_err = |source| SessionError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let contents = toml::to_string(session)?;
        std::fs::write(&self.path, contents).map_err(write_err)?;
        restrict_permissions(&self.path).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), user_id = session.user_id, "session saved");
        Ok(())
    }

    /// Removes the stored session. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool, SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SessionError::Write {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
