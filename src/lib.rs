//! execonsole - a remote-execution console core
//!
//! This library provides the engine behind a chat-driven developer
//! console: evaluate expressions or run statement blocks in a sandboxed
//! script host with full output capture, stream live shell sessions with
//! periodic updates, and plan how captured output reaches a chat surface
//! that caps messages at 2000 characters.
//!
//! ## Features
//!
//! - **Codeblock handling:** Fence stripping, markdown escaping, and
//!   display sanitization for untrusted output
//! - **Output capture:** Per-call stdout/stderr buffers with captured
//!   (never propagated) script errors
//! - **Delivery planning:** Inline message vs. file-attachment fallback,
//!   decided against the platform budget
//! - **Sandboxed execution:** Pluggable [`script::ScriptHost`] runtimes
//!   behind one engine, with layered scopes
//! - **Shell streaming:** `sh -c` sessions with merged output, periodic
//!   updates, stdin injection, and cancellation
//! - **Configuration:** TOML-based configuration files
//!
//! ## Module Organization
//!
//! - [`codeblock`] - Fence stripping and display sanitization
//! - [`capture`] - Output capture around one unit of work
//! - [`delivery`] - Inline-or-attachment delivery planning
//! - [`script`] - Script host trait, scopes, and the execution engine
//! - [`shell`] - Shell sessions and the streaming loop
//! - [`console`] - Application-facing facade
//! - [`config`] - Configuration loading and validation
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use execonsole::config::Config;
//! use execonsole::console::Console;
//! use execonsole::script::{InterpreterHost, SandboxEngine};
//!
//! # async fn run() -> execonsole::Result<()> {
//! let config = Config::default();
//! let host = Arc::new(InterpreterHost::new(&config.script));
//! let engine = SandboxEngine::new(host, Arc::new(BTreeMap::new()));
//! let console = Console::new(engine, &config);
//!
//! let payload = console.evaluate("```py\n1 + 1\n```", vec![]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! Each evaluate/execute/shell invocation runs as an independent task
//! with no global lock. Within a shell session the streaming loop is the
//! single owner of the output buffer, the child handle, and the stdin
//! writer; control signals and output chunks reach it only through
//! channels (`tokio::mpsc`).
//!
//! ## Safety and Reliability
//!
//! - **No Panics:** All fallible operations return `Result`
//! - **Captured Errors:** Errors raised by submitted code never escape
//!   the engine; they render in the "Exception" segment
//! - **Bounded Messages:** Output over the 2000-character budget falls
//!   back to file attachments, never a truncated message

#[macro_use]
extern crate tracing;

pub mod capture;
pub mod codeblock;
pub mod config;
pub mod console;
pub mod delivery;
pub mod error;
pub mod script;
pub mod shell;

// Re-exports for core functionality
pub use capture::{CaptureHandle, ExecutionResult, ScriptOutcome, ScriptValue};
pub use config::Config;
pub use console::Console;
pub use delivery::{DeliveryPayload, MESSAGE_BUDGET};
pub use error::{Error, Result, ScriptError};
pub use script::{ExecutionMode, ExecutionRequest, InterpreterHost, SandboxEngine, ScriptHost};
pub use shell::{ControlSignal, ShellHandle, ShellStatus, ShellUpdate, UpdateSink};

// Version information
/// The current version of execonsole from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The crate description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize tracing for binaries and tests.
///
/// Respects `RUST_LOG`; defaults to `info` for this crate when unset.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{NAME}=info")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
