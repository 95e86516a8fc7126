//! Result directories, per-architecture manifests and the final summary.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use types::ExecutionOutcome;

use crate::arch::Architecture;
use crate::error::ReportError;
use crate::pipeline::CompletedItem;

pub const PASS_MANIFEST: &str = "pass.txt";
pub const FAIL_MANIFEST: &str = "fail.txt";

/// `results_<stamp>_<arch>` directories under one output root.
#[derive(Debug, Clone)]
pub struct ResultsLayout {
    dirs: BTreeMap<Architecture, PathBuf>,
}

impl ResultsLayout {
    /// Local time as `yymmdd_HHMMSS`.
    pub fn timestamp() -> String {
        chrono::Local::now().format("%y%m%d_%H%M%S").to_string()
    }

    pub fn create(root: &Path, stamp: &str, archs: &[Architecture]) -> Result<Self, ReportError> {
        let mut dirs = BTreeMap::new();
        for arch in archs {
            let path = root.join(format!("results_{stamp}_{}", arch.id()));
            fs::create_dir_all(&path).map_err(|source| ReportError::CreateDir {
                path: path.clone(),
                source,
            })?;
            debug!(arch = %arch, dir = %path.display(), "results directory ready");
            dirs.insert(arch.clone(), path);
        }
        Ok(Self { dirs })
    }

    pub fn dir(&self, arch: &Architecture) -> Option<&Path> {
        self.dirs.get(arch).map(PathBuf::as_path)
    }

    pub fn architectures(&self) -> impl Iterator<Item = &Architecture> {
        self.dirs.keys()
    }
}

/// Outcomes recorded for one architecture, keyed by test label.
#[derive(Debug, Clone, Default)]
pub struct ArchitectureResultSet {
    outcomes: BTreeMap<String, ExecutionOutcome>,
}

impl ArchitectureResultSet {
    pub fn record(&mut self, label: String, outcome: ExecutionOutcome) {
        self.outcomes.insert(label, outcome);
    }

    pub fn passed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// `name: reason` lines, sorted by name.
    pub fn render_passes(&self) -> String {
        self.render(true)
    }

    pub fn render_failures(&self) -> String {
        self.render(false)
    }

    fn render(&self, passing: bool) -> String {
        let mut out = String::new();
        for (label, outcome) in &self.outcomes {
            if outcome.is_pass() == passing {
                out.push_str(label);
                out.push_str(": ");
                out.push_str(&outcome.reason());
                out.push('\n');
            }
        }
        out
    }
}

/// Collects completed items; owned by the coordinator only.
#[derive(Debug)]
pub struct ResultAggregator {
    layout: ResultsLayout,
    sets: BTreeMap<Architecture, ArchitectureResultSet>,
}

impl ResultAggregator {
    pub fn new(layout: ResultsLayout) -> Self {
        let sets = layout
            .architectures()
            .map(|arch| (arch.clone(), ArchitectureResultSet::default()))
            .collect();
        Self { layout, sets }
    }

    pub fn record(&mut self, item: CompletedItem) {
        self.sets
            .entry(item.arch)
            .or_default()
            .record(item.label, item.outcome);
    }

    /// Writes both manifests for every architecture, even empty ones.
    pub fn finish(self, not_run: usize, cancelled: bool) -> Result<Summary, ReportError> {
        let mut summary = Summary {
            architectures: Vec::with_capacity(self.sets.len()),
            not_run,
            cancelled,
        };
        for (arch, set) in &self.sets {
            let Some(dir) = self.layout.dir(arch) else {
                continue;
            };
            write_manifest(&dir.join(PASS_MANIFEST), &set.render_passes())?;
            write_manifest(&dir.join(FAIL_MANIFEST), &set.render_failures())?;
            info!(
                arch = %arch,
                passed = set.passed(),
                failed = set.failed(),
                "manifests written to {}",
                dir.display()
            );
            summary.architectures.push(ArchSummary {
                arch: arch.clone(),
                passed: set.passed(),
                failed: set.failed(),
            });
        }
        Ok(summary)
    }
}

fn write_manifest(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchSummary {
    pub arch: Architecture,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub architectures: Vec<ArchSummary>,
    pub not_run: usize,
    pub cancelled: bool,
}

impl Summary {
    pub fn failures(&self) -> usize {
        self.architectures.iter().map(|a| a.failed).sum()
    }

    pub fn passes(&self) -> usize {
        self.architectures.iter().map(|a| a.passed).sum()
    }

    pub fn print(&self) {
        println!("\n--- Results ---");
        for arch in &self.architectures {
            println!(
                "{}: {} passed, {} failed",
                arch.arch,
                format_count(arch.passed),
                format_count(arch.failed)
            );
        }
        println!(
            "total: {} passed, {} failed",
            format_count(self.passes()),
            format_count(self.failures())
        );
        if self.cancelled {
            println!("cancelled: {} items not run", format_count(self.not_run));
        }
    }
}

fn format_count(value: usize) -> String {
    let mut digits = value.to_string();
    let mut out = String::new();
    let mut count = 0;
    while let Some(ch) = digits.pop() {
        if count == 3 {
            out.push(',');
            count = 0;
        }
        out.push(ch);
        count += 1;
    }
    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use types::ToolFault;

    use super::*;

    fn completed(arch: &Architecture, label: &str, outcome: ExecutionOutcome) -> CompletedItem {
        CompletedItem {
            arch: arch.clone(),
            label: label.to_string(),
            outcome,
        }
    }

    #[test]
    fn manifests_are_sorted_and_split() {
        let root = tempfile::tempdir().expect("tempdir");
        let rv32 = Architecture::new("RV32IMACFD");
        let rv64 = Architecture::new("RV64IMACFD");
        let layout = ResultsLayout::create(root.path(), "250101_120000", &[rv32.clone(), rv64.clone()])
            .expect("layout");
        let rv32_dir = layout.dir(&rv32).expect("rv32 dir").to_path_buf();
        let rv64_dir = layout.dir(&rv64).expect("rv64 dir").to_path_buf();
        assert!(rv32_dir.ends_with("results_250101_120000_RV32IMACFD"));

        let mut results = ResultAggregator::new(layout);
        results.record(completed(&rv32, "sub", ExecutionOutcome::Timeout));
        results.record(completed(&rv32, "add", ExecutionOutcome::Pass("0".into())));
        results.record(completed(&rv32, "and", ExecutionOutcome::Fail("subtest 3".into())));
        results.record(completed(
            &rv32,
            "beq",
            ExecutionOutcome::ToolError(ToolFault::SymbolMissing("tohost".into())),
        ));
        let summary = results.finish(0, false).expect("finish");

        let pass = fs::read_to_string(rv32_dir.join(PASS_MANIFEST)).expect("pass.txt");
        let fail = fs::read_to_string(rv32_dir.join(FAIL_MANIFEST)).expect("fail.txt");
        assert_eq!(pass, "add: 0\n");
        assert_eq!(
            fail,
            "and: subtest 3\nbeq: symbol tohost not found\nsub: timeout\n"
        );

        assert_eq!(fs::read_to_string(rv64_dir.join(PASS_MANIFEST)).expect("pass"), "");
        assert_eq!(fs::read_to_string(rv64_dir.join(FAIL_MANIFEST)).expect("fail"), "");

        assert_eq!(summary.passes(), 1);
        assert_eq!(summary.failures(), 3);
    }

    #[test]
    fn counts_get_separators() {
        assert_eq!(format_count(7), "7");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
