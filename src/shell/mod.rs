//! Interactive shell sessions with live output streaming
//!
//! A spawned shell runs under a single-owner streaming loop that
//! accumulates merged stdout/stderr, pushes periodic output updates
//! through an [`UpdateSink`], and reacts to control signals (cancel,
//! stdin injection) delivered over a channel. The loop alone touches the
//! buffer, the child handle, and the stdin writer.

pub mod controller;
pub mod session;

use async_trait::async_trait;

use crate::delivery::DeliveryPayload;
use crate::error::Result;

pub use controller::{ShellController, ShellHandle};
pub use session::{ShellSession, ShellStatus};

/// A control-surface event aimed at a running session.
///
/// Produced outside the streaming loop and delivered over its mpsc
/// channel; signals arriving after the session leaves Running are
/// swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    /// Kill the child and end the session without an exit annotation
    Cancel,
    /// Write raw bytes to the child's stdin
    SendInput(Vec<u8>),
}

/// One incremental update pushed through the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellUpdate {
    /// Replace the displayed output with a freshly planned payload
    Output {
        payload: DeliveryPayload,
        /// Whether the control surface should stay interactive
        controls_live: bool,
    },
    /// Remove the interactive controls without touching the output
    RetractControls,
    /// Append a short line of text to whatever is displayed
    Annotation { text: String },
}

/// Destination for session updates: a chat message being edited, a test
/// recorder, anything that can absorb [`ShellUpdate`]s in order.
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn deliver(&self, update: ShellUpdate) -> Result<()>;
}
