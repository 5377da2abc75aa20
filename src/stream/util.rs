// src/stream/util.rs

//! Cancellation-aware channel helpers.
//!
//! Every value pushed across a task boundary inside the engine goes through
//! one of these, so a fired [`CancellationToken`] unblocks the sender instead
//! of leaving it parked on a full channel.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Send `item` into `tx`, or give up once `token` is cancelled.
///
/// Returns `true` if the item was accepted by the channel. A closed receiver
/// counts as aborted.
pub async fn send_or_abort<T>(token: &CancellationToken, tx: &mpsc::Sender<T>, item: T) -> bool {
    if token.is_cancelled() {
        return false;
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        res = tx.send(item) => res.is_ok(),
    }
}

/// Like [`send_or_abort`], but also gives up once `timeout` has elapsed.
pub async fn send_with_timeout<T>(
    token: &CancellationToken,
    tx: &mpsc::Sender<T>,
    item: T,
    timeout: Duration,
) -> bool {
    if token.is_cancelled() {
        return false;
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(timeout) => false,
        res = tx.send(item) => res.is_ok(),
    }
}
