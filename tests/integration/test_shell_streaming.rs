//! Shell streaming integration tests against a real /bin/sh

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use execonsole::config::ShellConfig;
use execonsole::delivery::{DeliveryPayload, SHELL_OVERFLOW_NOTICE};
use execonsole::error::Result;
use execonsole::shell::{
    ControlSignal, ShellController, ShellStatus, ShellUpdate, UpdateSink,
};

struct RecordingSink {
    updates: Mutex<Vec<ShellUpdate>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            updates: Mutex::new(Vec::new()),
        })
    }

    fn updates(&self) -> Vec<ShellUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdateSink for RecordingSink {
    async fn deliver(&self, update: ShellUpdate) -> Result<()> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }
}

fn fast_controller() -> ShellController {
    ShellController::new(ShellConfig {
        update_interval_ms: 20,
        ..Default::default()
    })
}

fn final_output(updates: &[ShellUpdate]) -> Option<&DeliveryPayload> {
    updates.iter().rev().find_map(|update| match update {
        ShellUpdate::Output { payload, .. } => Some(payload),
        _ => None,
    })
}

#[tokio::test]
async fn test_output_accumulates_across_writes() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn(
            "printf 'a'; sleep 0; printf 'b'",
            Arc::clone(&sink) as Arc<dyn UpdateSink>,
        )
        .unwrap();

    assert_eq!(handle.wait().await.unwrap(), ShellStatus::Exited(0));

    let updates = sink.updates();
    let last = final_output(&updates).expect("expected an output update");
    assert_eq!(last.inline_text(), Some("```\nab\n```"));
    assert_eq!(
        updates.last(),
        Some(&ShellUpdate::Annotation {
            text: "Process exited with code 0".to_string()
        })
    );
}

#[tokio::test]
async fn test_stderr_is_merged_into_output() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn(
            "echo out; echo err 1>&2",
            Arc::clone(&sink) as Arc<dyn UpdateSink>,
        )
        .unwrap();

    handle.wait().await.unwrap();

    let updates = sink.updates();
    let text = final_output(&updates)
        .and_then(|payload| payload.inline_text())
        .expect("expected inline output");
    assert!(text.contains("out"));
    assert!(text.contains("err"));
}

#[tokio::test]
async fn test_terminal_output_retracts_controls() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn("echo done", Arc::clone(&sink) as Arc<dyn UpdateSink>)
        .unwrap();

    handle.wait().await.unwrap();

    // Every output update except possibly intermediate ones must end with
    // controls retracted; the final Output carries controls_live = false.
    let last_output = sink
        .updates()
        .iter()
        .rev()
        .find_map(|update| match update {
            ShellUpdate::Output { controls_live, .. } => Some(*controls_live),
            _ => None,
        })
        .expect("expected an output update");
    assert!(!last_output);
}

#[tokio::test]
async fn test_whitespace_only_output_skips_updates() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn("printf '  \\n'", Arc::clone(&sink) as Arc<dyn UpdateSink>)
        .unwrap();

    handle.wait().await.unwrap();

    let updates = sink.updates();
    assert!(!updates
        .iter()
        .any(|update| matches!(update, ShellUpdate::Output { .. })));
    // The exit annotation still arrives
    assert_eq!(
        updates.last(),
        Some(&ShellUpdate::Annotation {
            text: "Process exited with code 0".to_string()
        })
    );
}

#[tokio::test]
async fn test_cancel_mid_run() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn(
            "echo started; sleep 30",
            Arc::clone(&sink) as Arc<dyn UpdateSink>,
        )
        .unwrap();

    // Let at least one update tick happen before cancelling.
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.signal(ControlSignal::Cancel).await.unwrap();

    assert_eq!(handle.wait().await.unwrap(), ShellStatus::Cancelled);

    let updates = sink.updates();
    assert!(!updates
        .iter()
        .any(|update| matches!(update, ShellUpdate::Annotation { .. })));
    // Controls shown by the periodic update are retracted on cancel.
    assert_eq!(updates.last(), Some(&ShellUpdate::RetractControls));
}

#[tokio::test]
async fn test_send_input_echoes_through_cat() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn("head -n 2", Arc::clone(&sink) as Arc<dyn UpdateSink>)
        .unwrap();

    handle
        .signal(ControlSignal::SendInput(b"first\n".to_vec()))
        .await
        .unwrap();
    handle
        .signal(ControlSignal::SendInput(b"second\n".to_vec()))
        .await
        .unwrap();

    assert_eq!(handle.wait().await.unwrap(), ShellStatus::Exited(0));

    let updates = sink.updates();
    let text = final_output(&updates)
        .and_then(|payload| payload.inline_text())
        .expect("expected inline output");
    assert!(text.contains("first"));
    assert!(text.contains("second"));
}

#[tokio::test]
async fn test_oversized_output_falls_back_to_file() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn("seq 1 2000", Arc::clone(&sink) as Arc<dyn UpdateSink>)
        .unwrap();

    handle.wait().await.unwrap();

    let updates = sink.updates();
    match final_output(&updates).expect("expected an output update") {
        DeliveryPayload::Attachments { notice, files } => {
            assert_eq!(notice, SHELL_OVERFLOW_NOTICE);
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].filename, "output.txt");
            assert!(files[0].bytes.starts_with(b"1\n2\n"));
        }
        DeliveryPayload::Inline { .. } => panic!("expected attachment fallback"),
    }
}

#[tokio::test]
async fn test_exit_code_from_failing_command() {
    let sink = RecordingSink::new();
    let handle = fast_controller()
        .spawn("exit 42", Arc::clone(&sink) as Arc<dyn UpdateSink>)
        .unwrap();

    assert_eq!(handle.wait().await.unwrap(), ShellStatus::Exited(42));
    assert_eq!(
        sink.updates().last(),
        Some(&ShellUpdate::Annotation {
            text: "Process exited with code 42".to_string()
        })
    );
}
