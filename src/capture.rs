//! Output capture for script execution
//!
//! Runs one unit of work while its textual stdout/stderr are redirected
//! into private per-call buffers, and folds the produced value or raised
//! error into an [`ExecutionResult`]. Raised errors are captured, never
//! propagated; both buffers are finalized on every exit path.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::{Result, ScriptError};

/// Opaque value produced by a script host.
///
/// The engine never interprets host values beyond rendering them, so JSON
/// is a sufficient interchange shape.
pub type ScriptValue = serde_json::Value;

/// What one run of submitted code produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// The code produced a value (which may be falsy, e.g. zero)
    Value(ScriptValue),
    /// The code completed without producing a value
    NoValue,
    /// The code raised; captured, not propagated
    Error(ScriptError),
}

/// Cloneable writer pair for the private stdout/stderr buffers of a
/// single capture call. Hosts hold a clone while the unit of work runs.
#[derive(Debug, Clone, Default)]
pub struct CaptureHandle {
    stdout: Arc<Mutex<String>>,
    stderr: Arc<Mutex<String>>,
}

impl CaptureHandle {
    /// Append text to the captured stdout stream
    pub fn write_stdout(&self, text: &str) {
        self.stdout
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_str(text);
    }

    /// Append text to the captured stderr stream
    pub fn write_stderr(&self, text: &str) {
        self.stderr
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_str(text);
    }

    /// Take the buffer contents. The buffers stay usable but empty, so a
    /// late writer clone cannot resurrect output into a finished result.
    fn finalize(&self) -> (String, String) {
        let stdout = std::mem::take(
            &mut *self
                .stdout
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        let stderr = std::mem::take(
            &mut *self
                .stderr
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        (stdout, stderr)
    }
}

/// Result of one captured execution. Created fresh per request.
///
/// The value and error slots are mutually exclusive: a captured error
/// always suppresses a return value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    /// Produced return value, if any. `None` is absent, which is distinct
    /// from a present falsy value.
    pub return_value: Option<ScriptValue>,
    /// Captured error, if the code raised
    pub error: Option<ScriptError>,
    /// Captured stdout text (may be empty)
    pub stdout: String,
    /// Captured stderr text (may be empty)
    pub stderr: String,
}

/// Render a script value the way it is shown to the caller: strings
/// render bare, everything else through its JSON form.
pub fn display_value(value: &ScriptValue) -> String {
    match value {
        ScriptValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Run `unit` exactly once with a fresh capture buffer pair.
///
/// A captured [`ScriptOutcome::Error`] lands in the result's error slot.
/// An `Err` from the unit is an operational failure (it precedes the
/// submitted code proper) and propagates to the caller, with the buffers
/// already finalized.
pub async fn run_and_capture<F, Fut>(unit: F) -> Result<ExecutionResult>
where
    F: FnOnce(CaptureHandle) -> Fut,
    Fut: Future<Output = Result<ScriptOutcome>>,
{
    let capture = CaptureHandle::default();
    let outcome = unit(capture.clone()).await;

    // Finalize before branching so every exit path sees both buffers.
    let (stdout, stderr) = capture.finalize();
    let mut result = ExecutionResult {
        stdout,
        stderr,
        ..Default::default()
    };

    match outcome? {
        ScriptOutcome::Value(value) => result.return_value = Some(value),
        ScriptOutcome::NoValue => {}
        ScriptOutcome::Error(error) => {
            debug!("captured script error: {}", error);
            result.error = Some(error);
        }
    }
    Ok(result)
}
