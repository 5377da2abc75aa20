//! Draining event and result channels into plain values for assertions.

use std::collections::HashMap;

use tokio::sync::mpsc;
use sshmux::stream::{CommandId, Event, Results};

/// A comparable rendering of an [`Event`]. Failures keep only their message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Stdout(String),
    Stderr(String),
    Exit(i32),
    Failure(String),
}

impl From<&Event> for Seen {
    fn from(event: &Event) -> Self {
        match event {
            Event::Stdout(b) => Seen::Stdout(String::from_utf8_lossy(b).into_owned()),
            Event::Stderr(b) => Seen::Stderr(String::from_utf8_lossy(b).into_owned()),
            Event::Exit(code) => Seen::Exit(*code),
            Event::Failure(e) => Seen::Failure(e.to_string()),
        }
    }
}

/// Receive every event until the channel closes.
pub async fn collect_events(mut rx: mpsc::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Receive every result until the mux closes, grouped by command in
/// arrival order.
pub async fn collect_results(mut results: Results) -> HashMap<CommandId, Vec<Seen>> {
    let mut grouped: HashMap<CommandId, Vec<Seen>> = HashMap::new();
    while let Some(result) = results.recv().await {
        grouped
            .entry(result.command)
            .or_default()
            .push(Seen::from(&result.event));
    }
    grouped
}

