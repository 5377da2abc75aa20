// src/stream/event.rs

//! Discrete observations of a running process.

use std::fmt;
use std::io;

use thiserror::Error;

/// Why a process produced a `Failure` instead of an exit code.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The process could not be launched at all.
    #[error("failed to start process: {0}")]
    Start(#[source] io::Error),

    /// The process was launched but waiting for it failed.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] io::Error),

    /// The process was terminated by a signal and has no exit code.
    #[error("process terminated by signal {0}")]
    Signal(i32),
}

/// Kind of an [`Event`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Stdout,
    Stderr,
    Exit,
    Failure,
}

/// One discrete observation from a running process.
///
/// A well-formed sequence for one command is zero or more chunk events
/// followed by exactly one terminal event (`Exit` or `Failure`).
#[derive(Debug)]
pub enum Event {
    /// Bytes from a single read of the process's stdout.
    Stdout(Vec<u8>),
    /// Bytes from a single read of the process's stderr.
    Stderr(Vec<u8>),
    /// The process exited with this code (including non-zero).
    Exit(i32),
    /// The process could not be started or waited on.
    Failure(StreamError),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Stdout(_) => EventKind::Stdout,
            Event::Stderr(_) => EventKind::Stderr,
            Event::Exit(_) => EventKind::Exit,
            Event::Failure(_) => EventKind::Failure,
        }
    }

    /// Stdout bytes, or an empty slice for any other kind.
    pub fn stdout(&self) -> &[u8] {
        match self {
            Event::Stdout(bytes) => bytes,
            _ => &[],
        }
    }

    /// Stderr bytes, or an empty slice for any other kind.
    pub fn stderr(&self) -> &[u8] {
        match self {
            Event::Stderr(bytes) => bytes,
            _ => &[],
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Event::Exit(code) => Some(*code),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StreamError> {
        match self {
            Event::Failure(err) => Some(err),
            _ => None,
        }
    }

    /// True for `Exit` and `Failure`; nothing follows a terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Exit(_) | Event::Failure(_))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Stdout(bytes) => write!(f, "stdout: {}", String::from_utf8_lossy(bytes)),
            Event::Stderr(bytes) => write!(f, "stderr: {}", String::from_utf8_lossy(bytes)),
            Event::Exit(code) => write!(f, "exit: {code}"),
            Event::Failure(err) => write!(f, "error: {err}"),
        }
    }
}
