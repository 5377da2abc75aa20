// src/report/mod.rs

//! Rendering of mux results to the terminal and the overall verdict.
//!
//! A [`Report`] consumes [`CommandResult`]s in arrival order. It knows which
//! server a command belongs to through its [`Registry`], which the producer
//! fills before submitting each command.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::stream::{CommandId, CommandResult, Event, Source};
use crate::types::ReportMode;

const CHECK_OK: &str = "✓";
const CHECK_FAILED: &str = "x";

/// Shared map from command to the server it runs against.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    names: Arc<Mutex<HashMap<CommandId, String>>>,
}

impl Registry {
    pub fn associate(&self, command: CommandId, server: impl Into<String>) {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command, server.into());
    }

    /// Server name, or the command id if none was associated.
    pub fn name_of(&self, command: CommandId) -> String {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&command)
            .cloned()
            .unwrap_or_else(|| command.to_string())
    }

    /// Like [`name_of`](Self::name_of), but also drops the association.
    /// Called once a command has produced its terminal event.
    pub fn release(&self, command: CommandId) -> String {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&command)
            .unwrap_or_else(|| command.to_string())
    }
}

/// Tracks exit codes and renders results according to a [`ReportMode`].
pub struct Report<O: Write, E: Write> {
    mode: ReportMode,
    success_codes: BTreeSet<i32>,
    exit_codes: Vec<i32>,
    registry: Registry,
    /// Streams whose last chunk did not end with a newline.
    open_lines: HashSet<(CommandId, Source)>,
    out: O,
    err: E,
}

impl Report<io::Stdout, io::Stderr> {
    /// Report onto the process's stdout and stderr.
    pub fn to_terminal(mode: ReportMode) -> Self {
        Self::new(mode, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Report<O, E> {
    pub fn new(mode: ReportMode, out: O, err: E) -> Self {
        Self {
            mode,
            success_codes: BTreeSet::from([0]),
            exit_codes: Vec::new(),
            registry: Registry::default(),
            open_lines: HashSet::new(),
            out,
            err,
        }
    }

    /// Replace the set of exit codes counted as success (default `{0}`).
    pub fn with_success_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    /// Handle for associating servers with commands from another task.
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    pub fn associate(&self, command: CommandId, server: impl Into<String>) {
        self.registry.associate(command, server);
    }

    pub fn exit_codes(&self) -> &[i32] {
        &self.exit_codes
    }

    /// True if at least one command exited and every exit code is a
    /// success code.
    pub fn success(&self) -> bool {
        !self.exit_codes.is_empty()
            && self
                .exit_codes
                .iter()
                .all(|code| self.success_codes.contains(code))
    }

    /// Record and render one result.
    pub fn on(&mut self, result: &CommandResult) -> io::Result<()> {
        let server = if result.event.is_terminal() {
            self.registry.release(result.command)
        } else {
            self.registry.name_of(result.command)
        };

        match &result.event {
            Event::Stdout(bytes) => self.print_output(result.command, Source::Stdout, &server, bytes)?,
            Event::Stderr(bytes) => self.print_output(result.command, Source::Stderr, &server, bytes)?,
            Event::Failure(e) => {
                debug!(command = %result.command, %server, error = %e, "command failed");
                self.close_lines(result.command)?;
                if self.mode != ReportMode::Silent {
                    writeln!(self.err, "{server}: error: {e}")?;
                }
            }
            Event::Exit(code) => {
                self.exit_codes.push(*code);
                self.close_lines(result.command)?;
                self.print_result(&server, *code)?;
            }
        }

        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }

    /// Give back the writers (used by tests to inspect output).
    pub fn into_writers(self) -> (O, E) {
        (self.out, self.err)
    }

    fn print_output(&mut self, command: CommandId, source: Source, server: &str, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        match self.mode {
            ReportMode::Plain => self.writer(source).write_all(bytes),
            ReportMode::Host => {
                let key = (command, source);
                let mut at_line_start = !self.open_lines.contains(&key);
                let writer: &mut dyn Write = match source {
                    Source::Stdout => &mut self.out,
                    Source::Stderr => &mut self.err,
                };

                for line in bytes.split_inclusive(|b| *b == b'\n') {
                    if at_line_start {
                        write!(writer, "{server}: ")?;
                    }
                    writer.write_all(line)?;
                    at_line_start = line.ends_with(b"\n");
                }

                if at_line_start {
                    self.open_lines.remove(&key);
                } else {
                    self.open_lines.insert(key);
                }
                Ok(())
            }
            ReportMode::Check
            | ReportMode::CheckYes
            | ReportMode::CheckNo
            | ReportMode::Exit
            | ReportMode::Silent => Ok(()),
        }
    }

    /// Terminate lines a finished command left open, so the next prefix
    /// starts on a fresh line.
    fn close_lines(&mut self, command: CommandId) -> io::Result<()> {
        for source in [Source::Stdout, Source::Stderr] {
            if self.open_lines.remove(&(command, source)) {
                self.writer(source).write_all(b"\n")?;
            }
        }
        Ok(())
    }

    fn print_result(&mut self, server: &str, code: i32) -> io::Result<()> {
        let ok = self.success_codes.contains(&code);

        match self.mode {
            ReportMode::Check => {
                let mark = if ok { CHECK_OK } else { CHECK_FAILED };
                writeln!(self.out, "{server}: {mark}")
            }
            ReportMode::CheckYes if ok => writeln!(self.out, "{server}: {CHECK_OK}"),
            ReportMode::CheckNo if !ok => writeln!(self.out, "{server}: {CHECK_FAILED}"),
            ReportMode::Exit => writeln!(self.out, "{server}: {code}"),
            _ => Ok(()),
        }
    }

    fn writer(&mut self, source: Source) -> &mut dyn Write {
        match source {
            Source::Stdout => &mut self.out,
            Source::Stderr => &mut self.err,
        }
    }
}
