//! Transient success / error notifications.
//!
//! At most one toast is live at a time; a newer one replaces it and each
//! expires on its own after the configured time to live.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

impl Toast {
    /// Returns `true` once `ttl` has elapsed since the toast was shown.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= ttl
    }
}

/// Holder for the current toast.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Toast>,
}

impl Notifier {
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show_at(message.into(), ToastKind::Success, Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show_at(message.into(), ToastKind::Error, Instant::now());
    }

    /// Replaces the current toast with one shown at `now`.
    pub fn show_at(&mut self, message: String, kind: ToastKind, now: Instant) {
        tracing::debug!(?kind, %message, "toast");
        self.current = Some(Toast {
            message,
            kind,
            shown_at: now,
        });
    }

    /// The live toast at `now`, dropping it if it has expired.
    pub fn current(&mut self, now: Instant) -> Option<&Toast> {
        if self
            .current
            .as_ref()
            .is_some_and(|t| t.is_expired(self.ttl, now))
        {
            self.current = None;
        }
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}
