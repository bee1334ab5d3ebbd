//! End-to-end engine flows: submission in, delivery payload out

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use execonsole::capture::{CaptureHandle, ScriptOutcome, ScriptValue};
use execonsole::config::Config;
use execonsole::console::Console;
use execonsole::delivery::{DeliveryPayload, EXECUTION_OVERFLOW_NOTICE};
use execonsole::error::{Error, Result, ScriptError};
use execonsole::script::{SandboxEngine, Scope, ScriptHost};
use serde_json::json;

/// Scripted host: pattern-matches on the source text so flows can be
/// driven without a real interpreter.
struct ScriptedHost;

#[async_trait]
impl ScriptHost for ScriptedHost {
    fn language_pattern(&self) -> &str {
        "py(thon)?"
    }

    async fn eval_expression(
        &self,
        source: &str,
        scope: &Scope,
        capture: CaptureHandle,
    ) -> Result<ScriptOutcome> {
        match source {
            "1 + 1" => Ok(ScriptOutcome::Value(json!(2))),
            "0" => Ok(ScriptOutcome::Value(json!(0))),
            "who" => Ok(ScriptOutcome::Value(
                scope.get("who").cloned().unwrap_or(ScriptValue::Null),
            )),
            "noisy" => {
                capture.write_stdout("printed\n");
                capture.write_stderr("warned\n");
                Ok(ScriptOutcome::Value(json!("done")))
            }
            "huge" => Ok(ScriptOutcome::Value(json!("x".repeat(5000)))),
            "boom" => Ok(ScriptOutcome::Error(ScriptError::new(
                "RuntimeError: boom",
            ))),
            other => Err(Error::ScriptParseFailed {
                reason: format!("unscripted source: {other}"),
            }),
        }
    }

    async fn run_statements(
        &self,
        body: &str,
        _scope: &Scope,
        capture: CaptureHandle,
    ) -> Result<ScriptOutcome> {
        // Bodies arrive indented one level
        assert!(body.lines().all(|line| line.starts_with("    ")));
        if body.contains("print") {
            capture.write_stdout("side effect\n");
        }
        Ok(ScriptOutcome::NoValue)
    }
}

fn console() -> Console {
    let engine = SandboxEngine::new(Arc::new(ScriptedHost), Arc::new(BTreeMap::new()));
    Console::new(engine, &Config::default())
}

#[tokio::test]
async fn test_fenced_evaluate_renders_return_value() {
    let payload = console()
        .evaluate("```py\n1 + 1\n```", vec![])
        .await
        .unwrap();
    assert_eq!(payload.inline_text(), Some("**Return value**```\n2\n```"));
}

#[tokio::test]
async fn test_inline_backtick_evaluate() {
    let payload = console().evaluate("`1 + 1`", vec![]).await.unwrap();
    assert_eq!(payload.inline_text(), Some("**Return value**```\n2\n```"));
}

#[tokio::test]
async fn test_zero_is_rendered_not_dropped() {
    let payload = console().evaluate("0", vec![]).await.unwrap();
    assert_eq!(payload.inline_text(), Some("**Return value**```\n0\n```"));
}

#[tokio::test]
async fn test_context_binding_reaches_host() {
    let payload = console()
        .evaluate("who", vec![("who".to_string(), json!("caller"))])
        .await
        .unwrap();
    assert_eq!(
        payload.inline_text(),
        Some("**Return value**```\ncaller\n```")
    );
}

#[tokio::test]
async fn test_streams_render_after_value() {
    let payload = console().evaluate("noisy", vec![]).await.unwrap();
    assert_eq!(
        payload.inline_text(),
        Some(
            "**Return value**```\ndone\n```\
             **Output stream**```\nprinted\n```\
             **Error stream**```\nwarned\n```"
        )
    );
}

#[tokio::test]
async fn test_captured_error_renders_exception_segment() {
    let payload = console().evaluate("boom", vec![]).await.unwrap();
    assert_eq!(
        payload.inline_text(),
        Some("**Exception**```\nRuntimeError: boom\n```")
    );
}

#[tokio::test]
async fn test_oversized_value_uploads_as_file() {
    match console().evaluate("huge", vec![]).await.unwrap() {
        DeliveryPayload::Attachments { notice, files } => {
            assert_eq!(notice, EXECUTION_OVERFLOW_NOTICE);
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].filename, "return.txt");
            assert_eq!(files[0].bytes.len(), 5000);
        }
        DeliveryPayload::Inline { .. } => panic!("expected attachment fallback"),
    }
}

#[tokio::test]
async fn test_execute_produces_no_output_marker() {
    let payload = console().execute("x = 1", vec![]).await.unwrap();
    assert_eq!(payload.inline_text(), Some("No output"));
}

#[tokio::test]
async fn test_execute_captures_side_effects() {
    let payload = console()
        .execute("```py\nprint('hi')\n```", vec![])
        .await
        .unwrap();
    assert_eq!(
        payload.inline_text(),
        Some("**Output stream**```\nside effect\n```")
    );
}

#[tokio::test]
async fn test_parse_failure_propagates_to_caller() {
    let result = console().evaluate("not scripted", vec![]).await;
    assert!(matches!(result, Err(Error::ScriptParseFailed { .. })));
}
