// src/stream/mod.rs

//! Concurrent execution engine.
//!
//! - [`event`] defines the [`Event`] observations a process produces.
//! - [`process`] starts one process and streams its events.
//! - [`mux`] runs many processes on a fixed number of workers and merges
//!   their events into one channel.
//! - [`util`] holds the cancellation-aware send helpers used by both.

pub mod event;
pub mod mux;
pub mod process;
pub mod util;

pub use event::{Event, EventKind, StreamError};
pub use mux::{CommandResult, DEFAULT_PROBE, Mux, Results};
pub use process::{CommandId, RunnableCommand, Source, stream_command};
pub use util::{send_or_abort, send_with_timeout};
