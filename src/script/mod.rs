//! Script host abstraction and execution engine
//!
//! The engine is agnostic to how submitted code actually runs: a
//! [`ScriptHost`] implementation owns the runtime (an embedded
//! interpreter, an external language process, a test double) while the
//! engine owns the contract: scope merging, fence stripping, capture
//! semantics, and the evaluate/execute split.

pub mod engine;
pub mod interpreter;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::capture::{CaptureHandle, ScriptOutcome, ScriptValue};
use crate::error::Result;

pub use engine::{indent_body, ExecutionMode, ExecutionRequest, SandboxEngine};
pub use interpreter::InterpreterHost;

/// Layered name bindings for one execution: an immutable shared base plus
/// a per-call overlay. Lookup checks the overlay first; composing a scope
/// never mutates the base, so concurrent calls cannot leak bindings into
/// each other.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    base: Arc<BTreeMap<String, ScriptValue>>,
    overlay: BTreeMap<String, ScriptValue>,
}

impl Scope {
    /// Create a scope over the given base bindings
    pub fn new(base: Arc<BTreeMap<String, ScriptValue>>) -> Self {
        Self {
            base,
            overlay: BTreeMap::new(),
        }
    }

    /// Derive a scope sharing this base, with the given overlay entries
    pub fn with_overlay(&self, entries: impl IntoIterator<Item = (String, ScriptValue)>) -> Self {
        Self {
            base: Arc::clone(&self.base),
            overlay: entries.into_iter().collect(),
        }
    }

    /// Look up a binding; the overlay shadows the base
    pub fn get(&self, name: &str) -> Option<&ScriptValue> {
        self.overlay.get(name).or_else(|| self.base.get(name))
    }

    /// Number of visible bindings
    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.overlay.is_empty()
    }

    /// Flattened view for hosts that need a serialized namespace.
    /// Overlay entries shadow same-named base entries.
    pub fn flatten(&self) -> BTreeMap<String, ScriptValue> {
        let mut merged = (*self.base).clone();
        for (name, value) in &self.overlay {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }
}

/// A runtime that can evaluate submitted code.
///
/// Contract for implementations:
/// - an awaitable produced by the submitted code is awaited before being
///   reported as the outcome;
/// - errors raised *by the submitted code* (including during that await)
///   come back as `Ok(ScriptOutcome::Error(_))`, never as `Err`;
/// - `Err` is reserved for operational failures that precede the code
///   proper: parse/wrap failures, a missing runtime, a broken result
///   channel.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Fence language tag pattern accepted on submissions (e.g. `py(thon)?`)
    fn language_pattern(&self) -> &str;

    /// Acquire long-lived shared resources (network sessions and the
    /// like). Called once by the hosting application at module
    /// activation; resources must never be created per request.
    async fn activate(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources acquired in [`activate`](Self::activate).
    async fn deactivate(&self) -> Result<()> {
        Ok(())
    }

    /// Evaluate `source` as a single expression in `scope`
    async fn eval_expression(
        &self,
        source: &str,
        scope: &Scope,
        capture: CaptureHandle,
    ) -> Result<ScriptOutcome>;

    /// Run `body` as the body of an implicitly-declared asynchronous
    /// unit of work. The body arrives pre-indented one level so it can
    /// be embedded verbatim in the host's wrapper construct.
    async fn run_statements(
        &self,
        body: &str,
        scope: &Scope,
        capture: CaptureHandle,
    ) -> Result<ScriptOutcome>;
}
