//! Error types and Result aliases for execonsole

use std::fmt;
use std::path::PathBuf;

/// Result type alias for execonsole operations
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by user-submitted code or by an external runtime,
/// captured and rendered to the caller rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScriptError {
    /// Human-readable error text, shown in the "Exception" segment
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Main error type for execonsole operations.
///
/// These are *operational* failures that surface synchronously to the
/// caller. Errors raised inside submitted code are captured instead and
/// live in [`ScriptError`].
#[derive(Debug)]
pub enum Error {
    // === Script engine errors ===
    /// Submitted source could not be parsed/wrapped by the script host
    ScriptParseFailed {
        reason: String,
    },

    /// The script host runtime could not be started
    ScriptHostUnavailable {
        runtime: String,
        reason: String,
    },

    /// The script host produced a malformed result record
    ScriptResultMalformed {
        reason: String,
    },

    /// Building or serializing the evaluation scope for a host failed
    ScopeConstructionFailed {
        reason: String,
    },

    // === Shell session errors ===
    /// Failed to spawn the shell process
    ShellSpawnFailed {
        command: String,
        reason: String,
    },

    /// Failed to write injected input to the shell's stdin
    ShellInputSendFailed {
        reason: String,
    },

    /// A shell stream handle was missing at spawn time
    ShellStreamUnavailable {
        stream: String,
    },

    /// Delivering an update through the sink failed. Returned by
    /// [`UpdateSink`](crate::shell::UpdateSink) implementations; the
    /// streaming loop logs it and keeps going.
    DeliveryFailed {
        reason: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors (for cases not yet categorized)
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Script engine errors
            Error::ScriptParseFailed { reason } => {
                write!(f, "Failed to parse submitted source: {}", reason)
            }
            Error::ScriptHostUnavailable { runtime, reason } => {
                write!(f, "Script runtime '{}' unavailable: {}", runtime, reason)
            }
            Error::ScriptResultMalformed { reason } => {
                write!(f, "Malformed script host result: {}", reason)
            }
            Error::ScopeConstructionFailed { reason } => {
                write!(f, "Failed to build evaluation scope: {}", reason)
            }

            // Shell session errors
            Error::ShellSpawnFailed { command, reason } => {
                write!(f, "Failed to spawn shell for '{}': {}", command, reason)
            }
            Error::ShellInputSendFailed { reason } => {
                write!(f, "Failed to send input to shell: {}", reason)
            }
            Error::ShellStreamUnavailable { stream } => {
                write!(f, "Shell {} stream unavailable", stream)
            }
            Error::DeliveryFailed { reason } => {
                write!(f, "Failed to deliver update: {}", reason)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
