// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod input;
pub mod logging;
pub mod report;
pub mod ssh;
pub mod stream;
pub mod types;

use std::io::Write;

use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::errors::{Result, SshmuxError};
use crate::report::Report;
use crate::ssh::{CommandBuilder, LinkedCommand};
use crate::stream::Mux;
use crate::types::ReportMode;

/// Everything a run needs, after merging CLI flags over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub workers: usize,
    pub mode: ReportMode,
    pub success_codes: Vec<i32>,
    pub exit_ok: bool,
    pub builder: CommandBuilder,
}

impl Settings {
    /// Merge `args` over `cfg` and validate the result.
    ///
    /// A `--port` of 0 means "no default port", overriding the file.
    pub fn resolve(args: &CliArgs, cfg: &ConfigFile) -> Result<Self> {
        let defaults = &cfg.defaults;

        let workers = args.workers.unwrap_or(defaults.workers);
        if workers == 0 {
            return Err(SshmuxError::InvalidArgument(
                "Must use at least one worker".to_string(),
            ));
        }

        let port = match args.port {
            Some(0) => None,
            Some(p) => Some(u16::try_from(p).map_err(|_| {
                SshmuxError::InvalidArgument("Invalid default port".to_string())
            })?),
            None => defaults.port,
        };

        let mode = match args.report_mode() {
            Some(parsed) => parsed.map_err(SshmuxError::InvalidArgument)?,
            None => defaults.mode,
        };

        let success_codes = if args.ok_codes.is_empty() {
            defaults.success_codes.clone()
        } else {
            args.ok_codes.clone()
        };

        let builder = CommandBuilder {
            tty: args.tty || defaults.tty,
            user: args
                .user
                .clone()
                .filter(|u| !u.is_empty())
                .or_else(|| defaults.user.clone()),
            port,
            command: args.command.clone(),
            program: args
                .ssh_program
                .clone()
                .unwrap_or_else(|| defaults.program.clone()),
        };

        Ok(Self {
            workers,
            mode,
            success_codes,
            exit_ok: args.exit_ok,
            builder,
        })
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and flag validation
/// - server input (`--servers` and/or piped stdin)
/// - the mux and its producer
/// - the terminal report
/// - Ctrl-C handling
///
/// Returns whether the run counts as a success for the process exit code.
pub async fn run(args: CliArgs) -> Result<bool> {
    let cfg = config::load_or_default(args.config.as_deref())?;
    let settings = Settings::resolve(&args, &cfg)?;
    debug!(?settings, "resolved settings");

    let lines = input::from_process(args.servers.as_deref()).ok_or(SshmuxError::NoServers)?;

    // Ctrl-C → cancel everything in flight.
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("interrupt received; cancelling all commands");
            token.cancel();
        });
    }

    let mut report = Report::to_terminal(settings.mode)
        .with_success_codes(settings.success_codes.iter().copied());

    execute(&settings, lines, token, &mut report).await?;
    report.flush()?;

    Ok(settings.exit_ok || report.success())
}

/// Build a command per server line, run them all through a [`Mux`] and feed
/// every result into `report`, until the mux closes.
pub async fn execute<R, O, E>(
    settings: &Settings,
    lines: R,
    token: CancellationToken,
    report: &mut Report<O, E>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    O: Write,
    E: Write,
{
    let (mux, mut results) = Mux::new(token.clone(), settings.workers);
    let mut linked = settings.builder.from_lines(lines, token.clone());
    let registry = report.registry();

    let producer = {
        let mux = mux.clone();
        tokio::spawn(async move {
            let mut submitted = 0usize;
            while let Some(LinkedCommand { server, command }) = linked.recv().await {
                registry.associate(command.id(), server);
                if !mux.submit(command).await {
                    break;
                }
                submitted += 1;
            }

            // No more input: let the workers wind down so results close.
            mux.shut();
            submitted
        })
    };

    let mut outcome = Ok(());
    while let Some(result) = results.recv().await {
        if let Err(e) = report.on(&result) {
            warn!(error = %e, "failed to write report; cancelling");
            token.cancel();
            outcome = Err(SshmuxError::from(e));
            break;
        }
    }

    match producer.await {
        Ok(submitted) => info!(submitted, "all results received"),
        Err(e) => warn!(error = %e, "command producer failed"),
    }

    outcome
}
