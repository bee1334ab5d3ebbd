//! Shell spawning and the streaming loop
//!
//! `ShellController::spawn` starts `sh -c <command>` with all three stdio
//! streams piped, bridges stdout and stderr into one merged chunk channel,
//! and hands the child to a dedicated streaming task. That task is the
//! single owner of the output buffer, the child handle, and the stdin
//! writer; everything else talks to it through channels via the returned
//! [`ShellHandle`].

use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::config::ShellConfig;
use crate::delivery::plan_shell_update;
use crate::error::{Error, Result};
use crate::shell::{ControlSignal, ShellSession, ShellStatus, ShellUpdate, UpdateSink};

/// Spawns shell sessions configured with a [`ShellConfig`].
pub struct ShellController {
    config: ShellConfig,
}

/// Caller-side handle to a running session. Dropping it detaches; the
/// session keeps streaming until the child exits or a Cancel arrives.
pub struct ShellHandle {
    id: Uuid,
    session: Arc<Mutex<ShellSession>>,
    signals: mpsc::Sender<ControlSignal>,
    completion: JoinHandle<()>,
}

fn lock_session(session: &Mutex<ShellSession>) -> MutexGuard<'_, ShellSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ShellHandle {
    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state
    pub fn status(&self) -> ShellStatus {
        lock_session(&self.session).status
    }

    /// Snapshot of the session metadata
    pub fn session(&self) -> ShellSession {
        lock_session(&self.session).clone()
    }

    /// Send a control signal to the streaming loop.
    ///
    /// A signal racing the session's end is swallowed: a closed channel
    /// means the loop already finished, which is not a caller error.
    pub async fn signal(&self, signal: ControlSignal) -> Result<()> {
        let _ = self.signals.send(signal).await;
        Ok(())
    }

    /// Wait for the streaming loop to finish and return the final status
    pub async fn wait(self) -> Result<ShellStatus> {
        self.completion
            .await
            .map_err(|e| Error::Other(format!("shell streaming task failed: {e}")))?;
        Ok(lock_session(&self.session).status)
    }
}

impl ShellController {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Spawn `command` under the configured shell and start streaming its
    /// output into `sink`.
    pub fn spawn(&self, command: &str, sink: Arc<dyn UpdateSink>) -> Result<ShellHandle> {
        let mut child = Command::new(&self.config.shell_path)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ShellSpawnFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or(Error::ShellStreamUnavailable {
            stream: "stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or(Error::ShellStreamUnavailable {
            stream: "stderr".to_string(),
        })?;
        let stdin = child.stdin.take().ok_or(Error::ShellStreamUnavailable {
            stream: "stdin".to_string(),
        })?;

        // Merge both output streams at spawn time so the loop polls one
        // channel. The readers stop at EOF and drop their senders.
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        spawn_reader(stdout, chunk_tx.clone(), self.config.read_chunk_bytes);
        spawn_reader(stderr, chunk_tx, self.config.read_chunk_bytes);

        let (signal_tx, signal_rx) = mpsc::channel(16);
        let session = Arc::new(Mutex::new(ShellSession::new(command)));
        let id = lock_session(&session).id;
        debug!(%id, command, "shell session spawned");

        let completion = tokio::spawn(stream_loop(
            child,
            stdin,
            chunk_rx,
            signal_rx,
            sink,
            Arc::clone(&session),
            Duration::from_millis(self.config.update_interval_ms),
        ));

        Ok(ShellHandle {
            id,
            session,
            signals: signal_tx,
            completion,
        })
    }
}

fn spawn_reader<R>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>, chunk_bytes: usize)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; chunk_bytes];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

async fn deliver(sink: &Arc<dyn UpdateSink>, update: ShellUpdate) {
    if let Err(err) = sink.deliver(update).await {
        warn!("failed to deliver shell update: {}", err);
    }
}

/// The streaming loop. Sole owner of the buffer, child, and stdin writer;
/// suspension points are the interval tick, the channel reads, and the
/// child wait.
async fn stream_loop(
    mut child: Child,
    mut stdin: ChildStdin,
    mut chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    mut signals: mpsc::Receiver<ControlSignal>,
    sink: Arc<dyn UpdateSink>,
    session: Arc<Mutex<ShellSession>>,
    update_interval: Duration,
) {
    let mut buffer = String::new();
    let mut dirty = false;
    let mut controls_shown = false;
    let mut chunks_open = true;
    let mut signals_open = true;

    let mut ticker = tokio::time::interval(update_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so updates start
    // one full interval after spawn.
    ticker.tick().await;

    loop {
        tokio::select! {
            chunk = chunks.recv(), if chunks_open => match chunk {
                Some(bytes) => {
                    // Lossy decode; a multi-byte sequence split across
                    // reads is an accepted edge case.
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    dirty = true;
                }
                None => chunks_open = false,
            },
            signal = signals.recv(), if signals_open => match signal {
                Some(ControlSignal::SendInput(bytes)) => {
                    // A write failure (closed stdin, broken pipe) does not
                    // end the session; the child decides when it is done.
                    if let Err(err) = write_input(&mut stdin, &bytes).await {
                        warn!("{}", err);
                    }
                }
                Some(ControlSignal::Cancel) => {
                    let id = lock_session(&session).id;
                    debug!(%id, "shell session cancelled");
                    if let Err(err) = child.start_kill() {
                        warn!("failed to kill shell child: {}", err);
                    }
                    let _ = child.wait().await;
                    lock_session(&session).mark_cancelled();
                    if controls_shown {
                        deliver(&sink, ShellUpdate::RetractControls).await;
                    }
                    break;
                }
                None => signals_open = false,
            },
            _ = ticker.tick() => {
                if dirty {
                    if let Some(payload) = plan_shell_update(&buffer) {
                        deliver(&sink, ShellUpdate::Output { payload, controls_live: true }).await;
                        controls_shown = true;
                    }
                    dirty = false;
                }
            },
            status = child.wait() => {
                let code = match status {
                    Ok(status) => status.code().unwrap_or(-1),
                    Err(err) => {
                        warn!("failed to reap shell child: {}", err);
                        -1
                    }
                };

                // Drain the readers to completion; the pipes hit EOF once
                // the child is gone.
                if chunks_open {
                    while let Some(bytes) = chunks.recv().await {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                    }
                }

                match plan_shell_update(&buffer) {
                    Some(payload) => {
                        deliver(&sink, ShellUpdate::Output { payload, controls_live: false }).await;
                    }
                    None if controls_shown => {
                        deliver(&sink, ShellUpdate::RetractControls).await;
                    }
                    None => {}
                }
                deliver(
                    &sink,
                    ShellUpdate::Annotation {
                        text: format!("Process exited with code {code}"),
                    },
                )
                .await;

                lock_session(&session).mark_exited(code);
                let id = lock_session(&session).id;
                debug!(%id, code, "shell session exited");
                break;
            }
        }
    }
}

async fn write_input(stdin: &mut ChildStdin, bytes: &[u8]) -> Result<()> {
    let written = async {
        stdin.write_all(bytes).await?;
        stdin.flush().await
    }
    .await;
    written.map_err(|e| Error::ShellInputSendFailed {
        reason: e.to_string(),
    })
}
