use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How results are rendered to the terminal.
///
/// - `Host`: prefix every output line with the server name (default).
/// - `Plain`: output as-is.
/// - `Check`: server and `✓`/`x` per finished command, no output.
/// - `CheckYes` / `CheckNo`: only the `✓` (resp. `x`) lines of `Check`.
/// - `Exit`: server and exit code, no output.
/// - `Silent`: nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    Host,
    Plain,
    Check,
    CheckYes,
    CheckNo,
    Exit,
    Silent,
}

impl ReportMode {
    pub const ALL: [ReportMode; 7] = [
        ReportMode::Host,
        ReportMode::Plain,
        ReportMode::Check,
        ReportMode::CheckYes,
        ReportMode::CheckNo,
        ReportMode::Exit,
        ReportMode::Silent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportMode::Host => "host",
            ReportMode::Plain => "plain",
            ReportMode::Check => "check",
            ReportMode::CheckYes => "check-yes",
            ReportMode::CheckNo => "check-no",
            ReportMode::Exit => "exit",
            ReportMode::Silent => "silent",
        }
    }
}

impl Default for ReportMode {
    fn default() -> Self {
        ReportMode::Host
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ReportMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| format!("Unknown report mode: {}", s.trim()))
    }
}
