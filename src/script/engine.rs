//! Sandbox execution engine
//!
//! One request in, one captured result out. The engine strips the
//! submission fence, composes the evaluation scope, and runs the code
//! through the injected [`ScriptHost`] under output capture. Requests
//! are single-shot: retries are a caller concern.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capture::{run_and_capture, ExecutionResult, ScriptValue};
use crate::codeblock::strip_fence;
use crate::error::Result;
use crate::script::{Scope, ScriptHost};

/// How the submitted source is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// A single expression whose value is the result
    Evaluate,
    /// A statement block run as the body of an async unit of work
    Execute,
}

/// One submission. Immutable once created; consumed by the engine.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Untrimmed source text, possibly still fenced
    pub source: String,
    /// Evaluate or execute
    pub mode: ExecutionMode,
    /// Per-call bindings overlaid on the engine's base scope
    /// (e.g. caller identity, a reply-reference value)
    pub context: Vec<(String, ScriptValue)>,
}

impl ExecutionRequest {
    pub fn evaluate(source: impl Into<String>, context: Vec<(String, ScriptValue)>) -> Self {
        Self {
            source: source.into(),
            mode: ExecutionMode::Evaluate,
            context,
        }
    }

    pub fn execute(source: impl Into<String>, context: Vec<(String, ScriptValue)>) -> Self {
        Self {
            source: source.into(),
            mode: ExecutionMode::Execute,
            context,
        }
    }
}

/// Indent every line of `source` by one level so it can be embedded as
/// the body of a generated wrapper construct. Whitespace-only lines are
/// indented too; they must not break the embedding.
pub fn indent_body(source: &str) -> String {
    source
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Execution engine over an injected script host
pub struct SandboxEngine {
    host: Arc<dyn ScriptHost>,
    base: Scope,
}

impl SandboxEngine {
    /// Create an engine with the given host and base bindings
    pub fn new(host: Arc<dyn ScriptHost>, base: Arc<BTreeMap<String, ScriptValue>>) -> Self {
        Self {
            host,
            base: Scope::new(base),
        }
    }

    /// The host driving this engine
    pub fn host(&self) -> &Arc<dyn ScriptHost> {
        &self.host
    }

    /// Run one request to its captured result
    pub async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        match request.mode {
            ExecutionMode::Evaluate => self.evaluate(request).await,
            ExecutionMode::Execute => self.execute(request).await,
        }
    }

    /// Evaluate the request's source as a single expression.
    ///
    /// Body errors (including one raised while awaiting an awaitable
    /// result) land in the result's error slot; fence-pattern and parse
    /// failures propagate, since they precede the unit of work.
    pub async fn evaluate(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let source = strip_fence(&request.source, self.host.language_pattern(), true, true)?;
        let scope = self.base.with_overlay(request.context);
        debug!(mode = "evaluate", bindings = scope.len(), "running submission");

        let host = Arc::clone(&self.host);
        run_and_capture(|capture| async move {
            host.eval_expression(&source, &scope, capture).await
        })
        .await
    }

    /// Run the request's source as a statement block.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let source = strip_fence(&request.source, self.host.language_pattern(), true, true)?;
        let body = indent_body(&source);
        let scope = self.base.with_overlay(request.context);
        debug!(mode = "execute", bindings = scope.len(), "running submission");

        let host = Arc::clone(&self.host);
        run_and_capture(|capture| async move {
            host.run_statements(&body, &scope, capture).await
        })
        .await
    }
}
