//! Turning a finished simulator run into a verdict.

use types::{ExecutionOutcome, ToolFault};

use crate::options::ExecutionMode;
use crate::runners::{ExitCondition, RunResult};

/// How the value written to the completion address encodes the verdict.
///
/// The two execution modes historically read the value differently, so the
/// strategy is tied to the mode rather than guessed from the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEncoding {
    /// Direct runs: the raw value must equal 1.
    Sentinel,
    /// Debugger runs: bit 0 flags abnormal termination, the remaining bits
    /// carry the sub-test index.
    FlaggedIndex,
}

impl SignalEncoding {
    pub const SUCCESS_SENTINEL: u64 = 1;

    pub fn for_mode(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Direct => SignalEncoding::Sentinel,
            ExecutionMode::Debugger => SignalEncoding::FlaggedIndex,
        }
    }

    pub fn decode(self, raw: u64) -> ExecutionOutcome {
        match self {
            SignalEncoding::Sentinel if raw == Self::SUCCESS_SENTINEL => {
                ExecutionOutcome::Pass(raw.to_string())
            }
            SignalEncoding::Sentinel => ExecutionOutcome::Fail(format!("{raw:08x}")),
            SignalEncoding::FlaggedIndex => {
                let index = raw >> 1;
                if raw & 1 == 0 {
                    ExecutionOutcome::Pass(index.to_string())
                } else {
                    ExecutionOutcome::Fail(format!("subtest {index}"))
                }
            }
        }
    }
}

/// Where the value written to the completion address is read back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource<'a> {
    /// `<marker> <hex>` lines the debugger script prints on stdout.
    Marker(&'a str),
    /// Contents of the logger plugin's output file: one decimal per write.
    LoggedValues(&'a [u8]),
}

impl SignalSource<'_> {
    pub fn value(&self, stdout: &[u8]) -> Option<u64> {
        match *self {
            SignalSource::Marker(marker) => extract_signal(stdout, marker),
            SignalSource::LoggedValues(logged) => extract_logged_value(logged),
        }
    }
}

/// Scans `stdout` backwards for a line holding `marker` followed by a
/// value, and parses the final token of that line as hex (`0x` optional).
/// Marker lines without a value, such as the plugin's own
/// `FileLogger terminating` warning, are skipped.
pub fn extract_signal(stdout: &[u8], marker: &str) -> Option<u64> {
    let text = String::from_utf8_lossy(stdout);
    text.lines().rev().find_map(|line| {
        let start = line.rfind(marker)? + marker.len();
        let token = line[start..].split_whitespace().last()?;
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        u64::from_str_radix(digits, 16).ok()
    })
}

/// The last value the logger plugin wrote to its output file.
pub fn extract_logged_value(logged: &[u8]) -> Option<u64> {
    let text = String::from_utf8_lossy(logged);
    let line = text.lines().rev().map(str::trim).find(|line| !line.is_empty())?;
    line.parse().ok()
}

pub fn classify(
    result: &RunResult,
    source: SignalSource<'_>,
    encoding: SignalEncoding,
) -> ExecutionOutcome {
    match result.exit {
        ExitCondition::TimedOut => ExecutionOutcome::Timeout,
        exit if !exit.success() => ExecutionOutcome::ToolError(ToolFault::ToolFailure),
        _ => match source.value(&result.stdout) {
            Some(raw) => encoding.decode(raw),
            None => ExecutionOutcome::ToolError(ToolFault::NoResult),
        },
    }
}
