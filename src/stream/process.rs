// src/stream/process.rs

//! Turn one external process into a stream of [`Event`]s.
//!
//! No assumptions are made about how the process buffers its output: every
//! read from its stdout/stderr pipe becomes one chunk event. Most programs
//! write line by line, so chunks are usually lines, but a partial line is
//! forwarded as soon as it arrives.

use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{Event, StreamError};
use super::util::send_or_abort;

/// Upper bound for a single chunk read from a pipe.
const CHUNK_SIZE: usize = 8 * 1024;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`RunnableCommand`].
///
/// Results coming out of the mux carry this id so a consumer can tell which
/// command they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A constructed, not yet started, external process.
///
/// The engine installs its own stdout/stderr pipes before starting it, so
/// any stdio configuration made on the inner command for those two streams
/// is overridden. A `RunnableCommand` is started at most once: it is moved
/// into the worker that runs it.
pub struct RunnableCommand {
    id: CommandId,
    command: Command,
}

impl RunnableCommand {
    pub fn new(command: Command) -> Self {
        Self {
            id: CommandId(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed)),
            command,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Program name, as given to the inner command.
    pub fn program(&self) -> String {
        self.command
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned()
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        let std = self.command.as_std();
        std::iter::once(std.get_program())
            .chain(std.get_args())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Debug for RunnableCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableCommand")
            .field("id", &self.id)
            .field("argv", &self.argv())
            .finish()
    }
}

/// Which pipe a chunk was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Stdout,
    Stderr,
}

/// Per-stream sink that turns each write into one chunk event.
struct OutputSink {
    source: Source,
    tx: mpsc::Sender<Event>,
    token: CancellationToken,
}

impl OutputSink {
    fn new(source: Source, tx: mpsc::Sender<Event>, token: CancellationToken) -> Self {
        Self { source, tx, token }
    }

    /// Push one chunk downstream. Fails with `BrokenPipe` if the push was
    /// aborted (consumer gone or cancelled).
    async fn write(&self, chunk: &[u8]) -> io::Result<usize> {
        let event = match self.source {
            Source::Stdout => Event::Stdout(chunk.to_vec()),
            Source::Stderr => Event::Stderr(chunk.to_vec()),
        };

        if send_or_abort(&self.token, &self.tx, event).await {
            Ok(chunk.len())
        } else {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }
}

/// Start `cmd` and stream its output and outcome through the returned
/// receiver.
///
/// The receiver yields zero or more chunk events followed by exactly one
/// `Exit` or `Failure`, then closes. If `token` fires, pending pushes are
/// abandoned, the child is killed and the receiver closes, possibly without
/// a terminal event.
///
/// Must be called from within a Tokio runtime.
pub fn stream_command(cmd: RunnableCommand, token: CancellationToken) -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel::<Event>(1);
    tokio::spawn(drive(cmd, tx, token));
    rx
}

async fn drive(cmd: RunnableCommand, tx: mpsc::Sender<Event>, token: CancellationToken) {
    let RunnableCommand { id, mut command } = cmd;

    if token.is_cancelled() {
        debug!(command = %id, "cancelled before start; not starting process");
        return;
    }

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(command = %id, error = %err, "failed to start process");
            send_or_abort(&token, &tx, Event::Failure(StreamError::Start(err))).await;
            return;
        }
    };

    debug!(command = %id, pid = ?child.id(), "process started");

    let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        let sink = OutputSink::new(Source::Stdout, tx.clone(), token.clone());
        pumps.push(tokio::spawn(pump(stdout, sink)));
    }
    if let Some(stderr) = child.stderr.take() {
        let sink = OutputSink::new(Source::Stderr, tx.clone(), token.clone());
        pumps.push(tokio::spawn(pump(stderr, sink)));
    }

    let status = tokio::select! {
        status = child.wait() => status,
        _ = token.cancelled() => {
            info!(command = %id, "cancellation requested; killing process");
            if let Err(e) = child.start_kill() {
                debug!(command = %id, error = %e, "kill failed; process may have exited already");
            }
            child.wait().await
        }
    };

    // Chunks must all be out before the terminal event.
    for pump in pumps {
        if let Err(e) = pump.await {
            warn!(command = %id, error = %e, "output reader task failed");
        }
    }

    let event = match status {
        Ok(status) => terminal_event(status),
        Err(err) => Event::Failure(StreamError::Wait(err)),
    };

    debug!(command = %id, ?event, "process finished");
    send_or_abort(&token, &tx, event).await;
}

/// Copy a pipe into a sink, one event per read, until EOF or abort.
async fn pump<R>(mut reader: R, sink: OutputSink)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = tokio::select! {
            biased;
            _ = sink.token.cancelled() => break,
            res = reader.read(&mut buf) => match res {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(source = ?sink.source, error = %e, "pipe read failed");
                    break;
                }
            },
        };

        if let Err(e) = sink.write(&buf[..n]).await {
            debug!(source = ?sink.source, error = %e, "output sink closed; dropping pipe");
            break;
        }
    }
}

fn terminal_event(status: ExitStatus) -> Event {
    if let Some(code) = status.code() {
        return Event::Exit(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Event::Failure(StreamError::Signal(signal));
        }
    }

    Event::Exit(-1)
}
