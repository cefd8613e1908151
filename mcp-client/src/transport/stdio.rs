//! Stdio transport implementation for local process MCP communication.
//!
//! This transport spawns a local process and exchanges newline-delimited
//! JSON-RPC messages over its stdin/stdout. The child gets a scrubbed
//! environment (see [`super::env`]) and is killed when the transport is
//! closed or dropped.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::env::child_environment;
use super::read_buffer::{serialize_message, ReadBuffer};
use super::{EventSender, EventSink, StderrMode, StdioConfig, Transport};
use crate::error::{ConnectionError, McpResult};
use crate::messages::JsonRpcMessage;

const TRANSPORT_TYPE: &str = "stdio";
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Stdio transport for local process MCP communication.
///
/// - Process spawning with configurable command, arguments, cwd and env
/// - Reader task framing stdout through a [`ReadBuffer`]
/// - Supervisor task that reports process exit as `Closed`
/// - Writes serialized through a lock, so `send` order is wire order
pub struct StdioTransport {
    config: StdioConfig,
    started: AtomicBool,
    stdin: Mutex<Option<ChildStdin>>,
    sink: EventSink,
    cancel: CancellationToken,
}

impl StdioTransport {
    /// Create a new stdio transport. Nothing is spawned until `start`.
    pub fn new(config: StdioConfig) -> Self {
        Self {
            config,
            started: AtomicBool::new(false),
            stdin: Mutex::new(None),
            sink: EventSink::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// The configuration this transport was built from.
    pub fn config(&self) -> &StdioConfig {
        &self.config
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .env_clear()
            .envs(child_environment(&self.config.env))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(match self.config.stderr {
                StderrMode::Inherit => Stdio::inherit(),
                StderrMode::Piped => Stdio::piped(),
                StderrMode::Null => Stdio::null(),
            })
            .kill_on_drop(true);

        if let Some(ref cwd) = self.config.cwd {
            command.current_dir(cwd);
        }

        command
    }

    fn missing_pipe(name: &str) -> ConnectionError {
        ConnectionError::Io {
            transport_type: TRANSPORT_TYPE.to_string(),
            reason: format!("Failed to get {}", name),
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&self, events: EventSender) -> McpResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ConnectionError::AlreadyStarted {
                transport_type: TRANSPORT_TYPE.to_string(),
            }
            .into());
        }

        tracing::info!(
            "Starting stdio transport: {} {:?}",
            self.config.command,
            self.config.args
        );

        let mut child =
            self.build_command()
                .spawn()
                .map_err(|e| ConnectionError::SpawnFailed {
                    command: self.config.command.clone(),
                    reason: e.to_string(),
                })?;

        let stdin = child.stdin.take().ok_or_else(|| Self::missing_pipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Self::missing_pipe("stdout"))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        *self.stdin.lock().await = Some(stdin);
        self.sink.attach(events);

        let reader = tokio::spawn(read_stdout(stdout, self.sink.clone()));
        tokio::spawn(supervise(
            child,
            reader,
            self.cancel.clone(),
            self.sink.clone(),
        ));

        tracing::info!("Stdio transport started");
        Ok(())
    }

    async fn send(&self, message: &JsonRpcMessage) -> McpResult<()> {
        let line = serialize_message(message)?;

        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or_else(|| ConnectionError::NotConnected {
            transport_type: TRANSPORT_TYPE.to_string(),
        })?;

        tracing::trace!("Sending to stdin: {}", line.trim_end());

        let io_error = |e: std::io::Error| ConnectionError::Io {
            transport_type: TRANSPORT_TYPE.to_string(),
            reason: format!("Failed to write to stdin: {}", e),
        };
        // write_all only resolves once the pipe has accepted every byte.
        stdin.write_all(line.as_bytes()).await.map_err(io_error)?;
        stdin.flush().await.map_err(io_error)?;

        Ok(())
    }

    async fn close(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Closing stdio transport");
        }
        self.cancel.cancel();
        // Dropping stdin gives well-behaved servers an EOF.
        self.stdin.lock().await.take();
    }

    fn transport_type(&self) -> &'static str {
        TRANSPORT_TYPE
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // The supervisor task owns the child and kills it on cancellation.
        self.cancel.cancel();
    }
}

async fn read_stdout(mut stdout: ChildStdout, sink: EventSink) {
    let mut buffer = ReadBuffer::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        match stdout.read(&mut chunk).await {
            Ok(0) => {
                tracing::debug!("Child process stdout closed (EOF)");
                break;
            }
            Ok(n) => {
                buffer.append(&chunk[..n]);
                loop {
                    match buffer.read_message() {
                        Ok(Some(message)) => {
                            tracing::trace!("Received from stdout: {:?}", message);
                            sink.message(message);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            tracing::warn!("Failed to parse message from stdout: {}", e);
                            sink.error(e);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("Error reading from stdout: {}", e);
                sink.error(ConnectionError::Io {
                    transport_type: TRANSPORT_TYPE.to_string(),
                    reason: format!("Failed to read from stdout: {}", e),
                });
                break;
            }
        }
    }

    if !buffer.is_empty() {
        tracing::debug!("Discarding {} bytes of unterminated output", buffer.len());
    }
    buffer.clear();
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    tracing::warn!("MCP process stderr: {}", trimmed);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Error reading from stderr: {}", e);
                break;
            }
        }
    }
}

/// Owns the child until it exits or the transport is cancelled, then emits
/// `Closed`.
///
/// A natural exit waits for the reader to drain stdout first, so responses
/// written just before exit are still delivered. A cancelled transport kills
/// the child and is a clean close, not an error.
async fn supervise(
    mut child: Child,
    reader: JoinHandle<()>,
    cancel: CancellationToken,
    sink: EventSink,
) {
    tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => tracing::info!("MCP process exited with status: {}", status),
                Err(e) => tracing::warn!("Error waiting for MCP process: {}", e),
            }
            tokio::select! {
                _ = reader => {}
                _ = cancel.cancelled() => {}
            }
        }
        _ = cancel.cancelled() => {
            tracing::debug!("Terminating child process (PID: {:?})", child.id());
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill child process: {}", e);
            }
            reader.abort();
        }
    }

    sink.closed();
}
