// src/stream/mux.rs

//! Bounded worker pool that runs [`RunnableCommand`]s and merges their
//! events into one shared result channel.
//!
//! Lifecycle:
//! - **accepting**: `workers` tasks each wait for a command.
//! - **draining**: after [`Mux::shut`] or once the cancellation token fires,
//!   no command is accepted anymore; workers finish what they run.
//! - **closed**: the last worker to exit drops the final result sender, so
//!   [`Results::recv`] returns `None`.
//!
//! Hand-off is a rendezvous: an idle worker posts a one-shot slot into the
//! ready queue and `submit` only succeeds once a worker has received the
//! command through such a slot. A command is never buffered between the
//! submitter and a worker.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::event::Event;
use super::process::{CommandId, RunnableCommand, stream_command};
use super::util::send_or_abort;

/// Probe window used by [`Mux::try_submit_now`].
pub const DEFAULT_PROBE: Duration = Duration::from_millis(1);

/// An [`Event`] tagged with the command it originated from.
#[derive(Debug)]
pub struct CommandResult {
    pub command: CommandId,
    pub event: Event,
}

type Slot = oneshot::Sender<RunnableCommand>;

/// Bookkeeping shared by all workers. Guarded by one lock so that
/// "decrement, check for zero, close" happens as a single step.
#[derive(Debug)]
struct PoolState {
    running: usize,
    results: Option<mpsc::Sender<CommandResult>>,
}

struct Shared {
    token: CancellationToken,
    /// Child of `token`: fires on `shut()` or on cancellation.
    shut: CancellationToken,
    ready: tokio::sync::Mutex<mpsc::Receiver<Slot>>,
    state: Mutex<PoolState>,
}

impl Shared {
    fn state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn results_sender(&self) -> Option<mpsc::Sender<CommandResult>> {
        self.state().results.clone()
    }

    fn worker_exited(&self, index: usize) {
        let mut state = self.state();
        state.running = state.running.saturating_sub(1);
        debug!(worker = index, running = state.running, "worker exited");

        if state.running == 0 && state.results.take().is_some() {
            info!("last worker exited; closing results");
        }
    }
}

/// Submission handle of the pool. Cheap to clone.
#[derive(Clone)]
pub struct Mux {
    shared: Arc<Shared>,
}

/// Receiving end of the shared result channel.
///
/// Closes once every worker has exited; there is no per-command "done"
/// marker other than each command's terminal event.
#[derive(Debug)]
pub struct Results {
    rx: mpsc::Receiver<CommandResult>,
}

impl Results {
    pub async fn recv(&mut self) -> Option<CommandResult> {
        self.rx.recv().await
    }
}

impl Mux {
    /// Start a pool with `workers` workers.
    ///
    /// Callers validate `workers >= 1`. With zero workers nothing is ever
    /// accepted and the results close immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(token: CancellationToken, workers: usize) -> (Self, Results) {
        let capacity = workers.max(1);
        let (results_tx, results_rx) = mpsc::channel::<CommandResult>(capacity);
        let (ready_tx, ready_rx) = mpsc::channel::<Slot>(capacity);

        // Count is set before any worker runs, so an early exit can never
        // observe zero while others are still starting up.
        let shared = Arc::new(Shared {
            shut: token.child_token(),
            token,
            ready: tokio::sync::Mutex::new(ready_rx),
            state: Mutex::new(PoolState {
                running: workers,
                results: (workers > 0).then_some(results_tx),
            }),
        });

        for index in 0..workers {
            tokio::spawn(worker(index, Arc::clone(&shared), ready_tx.clone()));
        }

        info!(workers, "mux started");
        (Self { shared }, Results { rx: results_rx })
    }

    /// Hand `cmd` to a worker, waiting until one is free.
    ///
    /// Returns `false` if the pool started draining (or was cancelled)
    /// before a worker took the command.
    ///
    /// Ownership of `cmd` moves into the pool; an accepted command is run by
    /// exactly one worker.
    pub async fn submit(&self, cmd: RunnableCommand) -> bool {
        self.hand_off(cmd, None).await
    }

    /// Like [`submit`](Self::submit), but also gives up after `timeout`.
    ///
    /// This is a best-effort probe: a worker may free up right after it
    /// gives up.
    pub async fn try_submit(&self, cmd: RunnableCommand, timeout: Duration) -> bool {
        self.hand_off(cmd, Some(timeout)).await
    }

    /// [`try_submit`](Self::try_submit) with [`DEFAULT_PROBE`].
    pub async fn try_submit_now(&self, cmd: RunnableCommand) -> bool {
        self.try_submit(cmd, DEFAULT_PROBE).await
    }

    /// Stop accepting commands. Workers wind down once their current
    /// command is finished, after which the results close.
    pub fn shut(&self) {
        if !self.shared.shut.is_cancelled() {
            info!("mux shut; no longer accepting commands");
        }
        self.shared.shut.cancel();
    }

    pub fn is_draining(&self) -> bool {
        self.shared.shut.is_cancelled()
    }

    pub fn running_workers(&self) -> usize {
        self.shared.state().running
    }

    async fn hand_off(&self, mut cmd: RunnableCommand, timeout: Option<Duration>) -> bool {
        let id = cmd.id();
        let shut = &self.shared.shut;

        if shut.is_cancelled() {
            debug!(command = %id, "mux draining; command not accepted");
            return false;
        }

        let expired = async {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        let mut ready = tokio::select! {
            biased;
            _ = shut.cancelled() => return false,
            _ = &mut expired => return false,
            guard = self.shared.ready.lock() => guard,
        };

        loop {
            let slot = tokio::select! {
                biased;
                _ = shut.cancelled() => return false,
                _ = &mut expired => {
                    debug!(command = %id, "no worker free within timeout");
                    return false;
                }
                slot = ready.recv() => match slot {
                    Some(slot) => slot,
                    None => return false,
                },
            };

            // A slot whose worker went away hands the command back.
            match slot.send(cmd) {
                Ok(()) => {
                    debug!(command = %id, "command handed to worker");
                    return true;
                }
                Err(returned) => cmd = returned,
            }
        }
    }
}

async fn worker(index: usize, shared: Arc<Shared>, ready_tx: mpsc::Sender<Slot>) {
    debug!(worker = index, "worker started");

    while let Some(cmd) = next_command(&shared.shut, &ready_tx).await {
        run_command(index, &shared, cmd).await;
    }

    shared.worker_exited(index);
}

/// Offer a slot and wait for a command to arrive through it.
async fn next_command(shut: &CancellationToken, ready_tx: &mpsc::Sender<Slot>) -> Option<RunnableCommand> {
    loop {
        let (slot_tx, mut slot_rx) = oneshot::channel();

        tokio::select! {
            biased;
            _ = shut.cancelled() => return None,
            res = ready_tx.send(slot_tx) => {
                if res.is_err() {
                    return None;
                }
            }
        }

        // A command already in the slot wins over a concurrent shut. Closing
        // the slot first makes a racing submitter see the refusal.
        tokio::select! {
            biased;
            res = &mut slot_rx => match res {
                Ok(cmd) => return Some(cmd),
                Err(_) => continue,
            },
            _ = shut.cancelled() => {
                slot_rx.close();
                return slot_rx.try_recv().ok();
            }
        }
    }
}

async fn run_command(index: usize, shared: &Shared, cmd: RunnableCommand) {
    let id = cmd.id();
    let Some(results) = shared.results_sender() else {
        return;
    };

    info!(worker = index, command = %id, program = %cmd.program(), "running command");

    let mut events = stream_command(cmd, shared.token.clone());
    while let Some(event) = events.recv().await {
        let result = CommandResult { command: id, event };
        if !send_or_abort(&shared.token, &results, result).await {
            debug!(worker = index, command = %id, "result not delivered; dropping remaining events");
            break;
        }
    }

    debug!(worker = index, command = %id, "command finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;

    fn echo(text: &str) -> RunnableCommand {
        let mut cmd = Command::new("echo");
        cmd.arg(text);
        RunnableCommand::new(cmd)
    }

    #[tokio::test]
    async fn shut_without_commands_closes_results() {
        let (mux, mut results) = Mux::new(CancellationToken::new(), 3);
        mux.shut();

        assert!(results.recv().await.is_none());
        assert_eq!(mux.running_workers(), 0);
    }

    #[tokio::test]
    async fn submit_after_shut_is_rejected() {
        let (mux, mut results) = Mux::new(CancellationToken::new(), 1);
        mux.shut();

        assert!(mux.is_draining());
        assert!(!mux.submit(echo("late")).await);
        assert!(results.recv().await.is_none());
    }

    #[tokio::test]
    async fn zero_workers_close_immediately() {
        let (mux, mut results) = Mux::new(CancellationToken::new(), 0);

        assert!(results.recv().await.is_none());
        assert!(!mux.try_submit(echo("nobody"), Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn results_are_tagged_with_their_command() {
        let (mux, mut results) = Mux::new(CancellationToken::new(), 1);
        let cmd = echo("tagged");
        let id = cmd.id();

        assert!(mux.submit(cmd).await);
        mux.shut();

        let mut seen = Vec::new();
        while let Some(result) = results.recv().await {
            assert_eq!(result.command, id);
            seen.push(result.event);
        }

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].stdout(), b"tagged\n");
        assert_eq!(seen[1].exit_code(), Some(0));
    }
}
