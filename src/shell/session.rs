//! Shell session bookkeeping

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle state of a shell session. Moves only forward: once the
/// session leaves Running it never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellStatus {
    /// Child process is alive and being polled
    Running,
    /// Child exited on its own with this code
    Exited(i32),
    /// Session was cancelled from the control surface
    Cancelled,
}

impl ShellStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ShellStatus::Running)
    }
}

/// Metadata for one shell session.
#[derive(Debug, Clone)]
pub struct ShellSession {
    /// Unique session identifier
    pub id: Uuid,
    /// Command line handed to the shell
    pub command: String,
    /// When the child was spawned
    pub started_at: DateTime<Utc>,
    /// When the session left Running, if it has
    pub ended_at: Option<DateTime<Utc>>,
    /// Current lifecycle state
    pub status: ShellStatus,
}

impl ShellSession {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            command: command.into(),
            started_at: Utc::now(),
            ended_at: None,
            status: ShellStatus::Running,
        }
    }

    /// Record a natural exit. No-op once the session is already terminal.
    pub fn mark_exited(&mut self, code: i32) {
        if self.status.is_running() {
            self.status = ShellStatus::Exited(code);
            self.ended_at = Some(Utc::now());
        }
    }

    /// Record a cancellation. No-op once the session is already terminal.
    pub fn mark_cancelled(&mut self) {
        if self.status.is_running() {
            self.status = ShellStatus::Cancelled;
            self.ended_at = Some(Utc::now());
        }
    }

    /// Wall-clock duration, up to now for a live session
    pub fn duration(&self) -> chrono::Duration {
        self.ended_at.unwrap_or_else(Utc::now) - self.started_at
    }
}
