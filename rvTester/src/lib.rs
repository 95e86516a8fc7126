mod annotate;
mod arch;
mod classify;
mod config;
mod discovery;
mod error;
mod options;
mod pipeline;
mod report;
mod runners;
mod scheduler;
mod settings;
mod symbols;

pub use annotate::{address_token, annotate};
pub use arch::Architecture;
pub use classify::{SignalEncoding, SignalSource, classify, extract_logged_value, extract_signal};
pub use config::{ConfigFile, DebuggerScript, RunConfig, SignalTap, ValueFile};
pub use discovery::{Filter, discover, expand, parse_all, scan, select};
pub use error::{ConfigError, DiscoveryError, ReportError, RunError, SettingsError, SymbolError};
pub use options::{ElfTarget, ExecutionMode, JitBackend, RunOptions};
pub use pipeline::{CompletedItem, Pipeline, WorkItem};
pub use report::{ArchSummary, ArchitectureResultSet, ResultAggregator, ResultsLayout, Summary};
pub use runners::{EtissRunner, ExitCondition, RunResult, Runner};
pub use scheduler::{Scheduler, SchedulerReport};
pub use settings::{DebuggerSettings, MemoryLayout, Settings, SymbolNames, SymbolRole};
pub use symbols::resolve;

pub use ::types::{ArchTag, ExecutionOutcome, ResolvedSymbols, TestCase, ToolFault, Virt};
