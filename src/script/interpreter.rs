//! External interpreter script host
//!
//! Drives a language runtime (python3 by default) in a subprocess. The
//! submission and the JSON-encoded scope travel in environment variables;
//! a small driver program seeds the namespace with a default stdlib
//! module set (scope entries shadow it), compiles and runs the code,
//! streams the user's stdout/stderr back through the pipes, and reports
//! the final value or error as a record-separator-prefixed JSON trailer
//! on stdout.
//!
//! Compile failures are operational (`ScriptParseFailed`); anything the
//! user's code raises comes back as a captured outcome.

use async_trait::async_trait;
use tokio::process::Command;

use crate::capture::{CaptureHandle, ScriptOutcome, ScriptValue};
use crate::config::ScriptConfig;
use crate::error::{Error, Result, ScriptError};
use crate::script::{Scope, ScriptHost};

/// Driver program run as `<runtime> -c DRIVER`. It emits exactly one
/// result record: a line starting with ASCII RS (0x1e) followed by JSON
/// with a `kind` of `value`, `novalue`, `error`, or `parse_error`.
const DRIVER: &str = r#"
import asyncio
import inspect
import io
import json
import os
import pprint
import re
import sys
from pathlib import Path

SOURCE = os.environ["EXECONSOLE_SOURCE"]
MODE = os.environ["EXECONSOLE_MODE"]
SCOPE = json.loads(os.environ.get("EXECONSOLE_SCOPE", "{}"))
RECORD_SEP = "\x1e"

DEFAULT_BINDINGS = {
    "asyncio": asyncio,
    "io": io,
    "json": json,
    "os": os,
    "pprint": pprint,
    "re": re,
    "sys": sys,
    "Path": Path,
}


def emit(record):
    sys.stdout.flush()
    sys.stderr.flush()
    sys.stdout.write("\n" + RECORD_SEP + json.dumps(record) + "\n")
    sys.stdout.flush()


try:
    if MODE == "eval":
        code = compile(SOURCE, "<submission>", "eval")
    else:
        code = compile("async def __body():\n" + SOURCE, "<submission>", "exec")
except SyntaxError as err:
    emit({"kind": "parse_error", "message": str(err)})
    sys.exit(0)

bindings = dict(DEFAULT_BINDINGS)
bindings.update(SCOPE)


async def __run():
    if MODE == "eval":
        value = eval(code, bindings, {})
        if inspect.isawaitable(value):
            value = await value
        return "value", value
    local = {}
    exec(code, bindings, local)
    value = await local["__body"]()
    if value is None:
        return "novalue", None
    return "value", value


try:
    kind, value = asyncio.run(__run())
except Exception as err:
    emit({"kind": "error", "message": f"{type(err).__name__}: {err}"})
else:
    if kind == "novalue":
        emit({"kind": "novalue"})
    else:
        try:
            json.dumps(value)
        except (TypeError, ValueError):
            value = str(value)
        emit({"kind": "value", "value": value})
"#;

const RECORD_SEP: char = '\x1e';

/// Result record emitted by the driver
#[derive(Debug, serde::Deserialize)]
struct DriverRecord {
    kind: String,
    #[serde(default)]
    value: Option<ScriptValue>,
    #[serde(default)]
    message: Option<String>,
}

/// Script host backed by an external interpreter process
pub struct InterpreterHost {
    runtime: String,
    language_pattern: String,
}

impl InterpreterHost {
    pub fn new(config: &ScriptConfig) -> Self {
        Self {
            runtime: config.interpreter.clone(),
            language_pattern: config.language_pattern.clone(),
        }
    }

    /// The runtime command this host drives
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    async fn run_driver(
        &self,
        mode: &str,
        source: &str,
        scope: &Scope,
        capture: CaptureHandle,
    ) -> Result<ScriptOutcome> {
        let scope_json = serde_json::to_string(&scope.flatten()).map_err(|e| {
            Error::ScopeConstructionFailed {
                reason: e.to_string(),
            }
        })?;
        let output = Command::new(&self.runtime)
            .arg("-c")
            .arg(DRIVER)
            .env("EXECONSOLE_MODE", mode)
            .env("EXECONSOLE_SOURCE", source)
            .env("EXECONSOLE_SCOPE", scope_json)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::ScriptHostUnavailable {
                runtime: self.runtime.clone(),
                reason: e.to_string(),
            })?;

        capture.write_stderr(&String::from_utf8_lossy(&output.stderr));

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(sep) = stdout.rfind(RECORD_SEP) else {
            return Err(Error::ScriptResultMalformed {
                reason: format!(
                    "no result record from runtime ({})",
                    output.status
                ),
            });
        };

        // Strip the single newline the driver inserts ahead of the record;
        // a newline the user's own output ended with stays put.
        let user_stdout = stdout[..sep].strip_suffix('\n').unwrap_or(&stdout[..sep]);
        capture.write_stdout(user_stdout);

        let record: DriverRecord =
            serde_json::from_str(stdout[sep + 1..].trim()).map_err(|e| {
                Error::ScriptResultMalformed {
                    reason: e.to_string(),
                }
            })?;

        match record.kind.as_str() {
            "value" => Ok(ScriptOutcome::Value(
                record.value.unwrap_or(ScriptValue::Null),
            )),
            "novalue" => Ok(ScriptOutcome::NoValue),
            "error" => Ok(ScriptOutcome::Error(ScriptError::new(
                record.message.unwrap_or_default(),
            ))),
            "parse_error" => Err(Error::ScriptParseFailed {
                reason: record.message.unwrap_or_default(),
            }),
            other => Err(Error::ScriptResultMalformed {
                reason: format!("unknown record kind '{other}'"),
            }),
        }
    }
}

#[async_trait]
impl ScriptHost for InterpreterHost {
    fn language_pattern(&self) -> &str {
        &self.language_pattern
    }

    /// Verify the runtime is reachable before the first submission.
    async fn activate(&self) -> Result<()> {
        let status = Command::new(&self.runtime)
            .arg("--version")
            .output()
            .await
            .map_err(|e| Error::ScriptHostUnavailable {
                runtime: self.runtime.clone(),
                reason: e.to_string(),
            })?;
        if !status.status.success() {
            return Err(Error::ScriptHostUnavailable {
                runtime: self.runtime.clone(),
                reason: format!("version probe exited with {}", status.status),
            });
        }
        debug!(runtime = %self.runtime, "script host activated");
        Ok(())
    }

    async fn eval_expression(
        &self,
        source: &str,
        scope: &Scope,
        capture: CaptureHandle,
    ) -> Result<ScriptOutcome> {
        self.run_driver("eval", source, scope, capture).await
    }

    async fn run_statements(
        &self,
        body: &str,
        scope: &Scope,
        capture: CaptureHandle,
    ) -> Result<ScriptOutcome> {
        self.run_driver("exec", body, scope, capture).await
    }
}
