use std::fmt;

/// Why a work item could not produce a verdict from the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFault {
    /// The binary has no completion symbol; the simulator was never started.
    SymbolMissing(String),
    /// The run finished but its output carried no parsable signal value.
    NoResult,
    /// The simulator (or the debugger wrapping it) exited non-zero.
    ToolFailure,
    /// The harness could not prepare or launch the run.
    Setup(String),
}

impl fmt::Display for ToolFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolFault::SymbolMissing(symbol) => write!(f, "symbol {symbol} not found"),
            ToolFault::NoResult => f.write_str("no result"),
            ToolFault::ToolFailure => f.write_str("tool error"),
            ToolFault::Setup(detail) => write!(f, "setup error: {detail}"),
        }
    }
}

/// Verdict for one (test, architecture) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Pass(String),
    Fail(String),
    Timeout,
    ToolError(ToolFault),
}

impl ExecutionOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ExecutionOutcome::Pass(_))
    }

    /// The text written after `name: ` in the manifests.
    pub fn reason(&self) -> String {
        match self {
            ExecutionOutcome::Pass(reason) | ExecutionOutcome::Fail(reason) => reason.clone(),
            ExecutionOutcome::Timeout => "timeout".to_string(),
            ExecutionOutcome::ToolError(fault) => fault.to_string(),
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Pass(reason) => write!(f, "pass ({reason})"),
            ExecutionOutcome::Fail(reason) => write!(f, "fail ({reason})"),
            ExecutionOutcome::Timeout => f.write_str("timeout"),
            ExecutionOutcome::ToolError(fault) => write!(f, "error ({fault})"),
        }
    }
}
