//! Console facade
//!
//! One object tying the pieces together for a hosting application:
//! evaluate/execute a submission all the way to a planned delivery
//! payload, or start a streaming shell session. Each invocation is an
//! independent task; the facade holds no per-request state.

use std::sync::Arc;

use crate::capture::ScriptValue;
use crate::codeblock::strip_fence;
use crate::config::Config;
use crate::delivery::{plan_execution, DeliveryPayload};
use crate::error::Result;
use crate::script::{ExecutionRequest, SandboxEngine};
use crate::shell::{ShellController, ShellHandle, UpdateSink};

/// Fence language tag pattern accepted on shell commands. Any lowercase
/// tag passes; the shell dialect is unknown at this layer.
const SHELL_LANGUAGE_PATTERN: &str = "[a-z]+";

/// Application-facing entry point
pub struct Console {
    engine: SandboxEngine,
    shell: ShellController,
}

impl Console {
    pub fn new(engine: SandboxEngine, config: &Config) -> Self {
        Self {
            engine,
            shell: ShellController::new(config.shell.clone()),
        }
    }

    /// The execution engine behind this console
    pub fn engine(&self) -> &SandboxEngine {
        &self.engine
    }

    /// Evaluate a (possibly fenced) expression and plan its delivery
    pub async fn evaluate(
        &self,
        source: &str,
        context: Vec<(String, ScriptValue)>,
    ) -> Result<DeliveryPayload> {
        let result = self
            .engine
            .run(ExecutionRequest::evaluate(source, context))
            .await?;
        Ok(plan_execution(&result))
    }

    /// Run a (possibly fenced) statement block and plan its delivery
    pub async fn execute(
        &self,
        source: &str,
        context: Vec<(String, ScriptValue)>,
    ) -> Result<DeliveryPayload> {
        let result = self
            .engine
            .run(ExecutionRequest::execute(source, context))
            .await?;
        Ok(plan_execution(&result))
    }

    /// Start a shell session for a (possibly fenced) command line.
    ///
    /// The handle carries the session id and the signal sender; dropping
    /// it does not cancel the session.
    pub fn start_shell(&self, command: &str, sink: Arc<dyn UpdateSink>) -> Result<ShellHandle> {
        let command = strip_fence(command, SHELL_LANGUAGE_PATTERN, true, true)?;
        self.shell.spawn(&command, sink)
    }
}
