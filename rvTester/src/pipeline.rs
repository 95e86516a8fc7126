//! Everything that happens to a single (test, architecture) pair.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};
use types::{ExecutionOutcome, ResolvedSymbols, TestCase, ToolFault};

use crate::annotate::annotate;
use crate::arch::Architecture;
use crate::classify::{SignalEncoding, SignalSource, classify};
use crate::config::{RunConfig, ValueFile};
use crate::error::{RunError, SymbolError};
use crate::options::{ElfTarget, ExecutionMode, RunOptions};
use crate::report::ResultsLayout;
use crate::runners::{RunResult, Runner};
use crate::settings::Settings;

/// One unit of scheduling.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub case: Arc<TestCase>,
    pub arch: Architecture,
    /// Name the result is recorded under.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedItem {
    pub arch: Architecture,
    pub label: String,
    pub outcome: ExecutionOutcome,
}

/// Shared, read-only state every worker uses to process an item.
#[derive(Debug)]
pub struct Pipeline {
    pub options: RunOptions,
    pub settings: Settings,
    pub layout: ResultsLayout,
    /// Where per-item configuration files are created.
    pub scratch_dir: PathBuf,
}

impl Pipeline {
    /// Resolves, configures, runs and classifies one item.
    ///
    /// Returns `None` only when the item was cancelled mid-run; such items
    /// are left out of the manifests.
    pub async fn process<R: Runner>(
        &self,
        runner: &R,
        item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Option<CompletedItem> {
        let span = info_span!("item", test = %item.case.stem, arch = %item.arch);
        self.process_inner(runner, item, cancel)
            .instrument(span)
            .await
            .map(|outcome| CompletedItem {
                arch: item.arch.clone(),
                label: item.label.clone(),
                outcome,
            })
    }

    async fn process_inner<R: Runner>(
        &self,
        runner: &R,
        item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Option<ExecutionOutcome> {
        let symbols = match self.resolve(&item.case).await {
            Ok(symbols) => symbols,
            Err(outcome) => return Some(outcome),
        };

        let setup_error = |err: &dyn std::fmt::Display| {
            warn!("{err}");
            Some(ExecutionOutcome::ToolError(ToolFault::Setup(err.to_string())))
        };

        // Direct runs have no debugger to intercept the write, so the logger
        // plugin records the value in a file of its own.
        let value_file = match self.options.mode {
            ExecutionMode::Direct => {
                match ValueFile::create(&self.scratch_dir, &item.case.stem, item.arch.id()) {
                    Ok(file) => Some(file),
                    Err(err) => return setup_error(&err),
                }
            }
            ExecutionMode::Debugger => None,
        };

        let mut config = RunConfig::for_case(
            &item.case,
            &symbols,
            item.arch.id(),
            &self.options,
            &self.settings,
        );
        if let Some(values) = &value_file {
            config = config.log_values_to(values.path());
        }
        let config = match config.write(&self.scratch_dir, &item.case.stem) {
            Ok(config) => config,
            Err(err) => return setup_error(&err),
        };

        let result = match runner.run(config.path(), &self.options, cancel).await {
            Ok(result) => result,
            Err(RunError::Cancelled) => {
                debug!("cancelled");
                return None;
            }
            Err(err) => {
                warn!(runner = runner.name(), "{err}");
                return Some(ExecutionOutcome::ToolError(ToolFault::Setup(err.to_string())));
            }
        };

        // An unreadable value file reads as empty; the exit condition still
        // decides timeouts and tool errors.
        let logged = match &value_file {
            Some(values) => Some(tokio::fs::read(values.path()).await.unwrap_or_else(|err| {
                warn!("failed to read {}: {err}", values.path().display());
                Vec::new()
            })),
            None => None,
        };
        let source = match &logged {
            Some(logged) => SignalSource::LoggedValues(logged),
            None => SignalSource::Marker(&self.settings.marker),
        };
        let encoding = SignalEncoding::for_mode(self.options.mode);
        let outcome = classify(&result, source, encoding);
        debug!(elapsed = ?result.elapsed, "{outcome}");

        let results_dir = self.layout.dir(&item.arch);
        if let Some(dir) = results_dir
            && (self.options.log_all || !outcome.is_pass())
        {
            write_logs(dir, &item.label, &result, &symbols).await;
        }

        match results_dir {
            Some(dir) if self.options.keep_config => {
                let dest = dir.join(format!("{}.ini", item.label));
                if let Err(err) = config.keep_as(&dest) {
                    warn!("{err}");
                }
            }
            _ => drop(config),
        }

        Some(outcome)
    }

    async fn resolve(&self, case: &TestCase) -> Result<ResolvedSymbols, ExecutionOutcome> {
        let elf = ElfTarget {
            path: case.binary.clone(),
        };
        let names = self.settings.symbols.clone();
        let resolved = tokio::task::spawn_blocking(move || crate::symbols::resolve(&elf, &names))
            .await
            .map_err(|err| ExecutionOutcome::ToolError(ToolFault::Setup(err.to_string())))?;
        resolved.map_err(|err| {
            warn!("{err}");
            match err {
                SymbolError::Missing { symbol, .. } => {
                    ExecutionOutcome::ToolError(ToolFault::SymbolMissing(symbol))
                }
                other => ExecutionOutcome::ToolError(ToolFault::Setup(other.to_string())),
            }
        })
    }
}

/// Failing to write a log never changes the verdict.
async fn write_logs(dir: &Path, label: &str, result: &RunResult, symbols: &ResolvedSymbols) {
    let logs = [
        (dir.join(format!("{label}.stdout")), annotate(&result.stdout, symbols)),
        (dir.join(format!("{label}.stderr")), result.stderr.clone()),
    ];
    for (path, contents) in logs {
        if let Err(err) = tokio::fs::write(&path, contents).await {
            warn!("failed to write {}: {err}", path.display());
        }
    }
}
