use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

#[derive(Debug, Clone)]
pub struct ElfTarget {
    pub path: PathBuf,
}

/// How the simulator is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Run the simulator on its own; the FileLogger plugin prints the value.
    Direct,
    /// Run the simulator under a scripted debugger that breaks in the
    /// logger and prints the written buffer.
    Debugger,
}

/// JIT backend selected through `jit.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JitBackend {
    Tcc,
    Gcc,
    Llvm,
}

impl JitBackend {
    pub fn id(self) -> &'static str {
        match self {
            JitBackend::Tcc => "TCCJIT",
            JitBackend::Gcc => "GCCJIT",
            JitBackend::Llvm => "LLVMJIT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub timeout: Duration,
    pub mode: ExecutionMode,
    pub jit: JitBackend,
    /// Adds the instruction printer plugin to every run.
    pub trace: bool,
    /// Move generated configuration files into the results directory
    /// instead of deleting them.
    pub keep_config: bool,
    /// Write stdout/stderr logs for passing tests too.
    pub log_all: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            mode: ExecutionMode::Debugger,
            jit: JitBackend::Tcc,
            trace: false,
            keep_config: false,
            log_all: false,
        }
    }
}
